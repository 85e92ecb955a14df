// src/catalog/ckan.rs

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::{multipart, Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{collections::HashSet, env, time::Duration};
use tracing::{debug, info, warn};
use url::Url;

use super::{Catalog, CatalogEntry};
use crate::config::CatalogConfig;
use crate::dataset::{Dataset, ResourceFile, ResourceView, Showcase};

pub const API_KEY_ENV: &str = "HDX_KEY";
pub const SITE_ENV: &str = "HDX_SITE";

const SEARCH_PAGE: usize = 1000;

/// `{"success": .., "result": .., "error": ..}` envelope of every action.
#[derive(Debug, Deserialize)]
struct ActionResponse {
    success: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<Value>,
}

impl ActionResponse {
    fn is_not_found(&self) -> bool {
        self.error
            .as_ref()
            .and_then(|e| e.get("__type"))
            .and_then(Value::as_str)
            == Some("Not Found Error")
    }
}

/// CKAN action API client.
pub struct CkanCatalog {
    client: Client,
    site: Url,
    api_key: String,
    updated_by_script: String,
}

impl CkanCatalog {
    pub fn new(
        mut site: Url,
        api_key: String,
        user_agent: &str,
        updated_by_script: String,
    ) -> Result<Self> {
        if !site.path().ends_with('/') {
            let path = format!("{}/", site.path());
            site.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(300))
            .build()
            .context("building catalog HTTP client")?;
        Ok(Self {
            client,
            site,
            api_key,
            updated_by_script,
        })
    }

    /// Site and key from the environment, site falling back to the config.
    pub fn from_env(config: &CatalogConfig) -> Result<Self> {
        let api_key =
            env::var(API_KEY_ENV).with_context(|| format!("{} is not set", API_KEY_ENV))?;
        let site = match env::var(SITE_ENV) {
            Ok(s) => Url::parse(&s).with_context(|| format!("parsing {}=`{}`", SITE_ENV, s))?,
            Err(_) => config.site.clone(),
        };
        info!(site = %site, "using catalog");
        Self::new(
            site,
            api_key,
            &config.user_agent,
            config.updated_by_script.clone(),
        )
    }

    fn action_url(&self, action: &str) -> Result<Url> {
        self.site
            .join(&format!("api/3/action/{}", action))
            .with_context(|| format!("building URL for `{}`", action))
    }

    fn send(&self, action: &str, req: RequestBuilder) -> Result<ActionResponse> {
        let resp = req
            .header("Authorization", &self.api_key)
            .send()
            .with_context(|| format!("calling `{}`", action))?;
        let status = resp.status();
        let body: ActionResponse = resp
            .json()
            .with_context(|| format!("decoding `{}` response ({})", action, status))?;
        debug!(action, %status, success = body.success, "catalog call");
        Ok(body)
    }

    fn post(&self, action: &str, body: &Value) -> Result<ActionResponse> {
        let url = self.action_url(action)?;
        self.send(action, self.client.post(url).json(body))
    }

    /// Call `action` and return its result, failing on `success: false`.
    fn call(&self, action: &str, body: &Value) -> Result<Value> {
        let resp = self.post(action, body)?;
        if !resp.success {
            bail!(
                "`{}` failed: {}",
                action,
                resp.error.unwrap_or(Value::Null)
            );
        }
        Ok(resp.result)
    }

    /// Like `call` for `*_show` actions, with "not found" mapped to `None`.
    fn show(&self, action: &str, id: &str) -> Result<Option<Value>> {
        let resp = self.post(action, &json!({ "id": id }))?;
        if resp.success {
            return Ok(Some(resp.result));
        }
        if resp.is_not_found() {
            return Ok(None);
        }
        Err(anyhow!(
            "`{}` for `{}` failed: {}",
            action,
            id,
            resp.error.unwrap_or(Value::Null)
        ))
    }

    fn upload(
        &self,
        package_id: &str,
        existing_id: Option<&str>,
        file: &ResourceFile,
    ) -> Result<Value> {
        let mut form = multipart::Form::new()
            .text("name", file.name.clone())
            .text("description", file.description.clone())
            .text("format", file.format.clone());
        let action = match existing_id {
            Some(id) => {
                form = form.text("id", id.to_string());
                "resource_update"
            }
            None => {
                form = form.text("package_id", package_id.to_string());
                "resource_create"
            }
        };
        let form = form
            .file("upload", &file.path)
            .with_context(|| format!("opening `{}`", file.path.display()))?;
        let url = self.action_url(action)?;
        let resp = self.send(action, self.client.post(url).multipart(form))?;
        if !resp.success {
            bail!(
                "`{}` for `{}` failed: {}",
                action,
                file.name,
                resp.error.unwrap_or(Value::Null)
            );
        }
        info!(resource = %file.name, action, "uploaded");
        Ok(resp.result)
    }

    fn replace_view(&self, resource_id: &str, view: &ResourceView) -> Result<()> {
        let existing = self.call("resource_view_list", &json!({ "id": resource_id }))?;
        for old in existing.as_array().into_iter().flatten() {
            if old.get("view_type").and_then(Value::as_str) == Some(view.view_type.as_str()) {
                if let Some(id) = old.get("id").and_then(Value::as_str) {
                    self.call("resource_view_delete", &json!({ "id": id }))?;
                }
            }
        }
        let mut body = serde_json::to_value(view)?;
        body["resource_id"] = json!(resource_id);
        self.call("resource_view_create", &body)?;
        Ok(())
    }
}

fn str_field<'v>(v: &'v Value, key: &str) -> Option<&'v str> {
    v.get(key).and_then(Value::as_str)
}

fn entry_from_package(pkg: &Value) -> Option<CatalogEntry> {
    let name = str_field(pkg, "name")?.to_string();
    let locations = pkg
        .get("groups")
        .and_then(Value::as_array)
        .map(|groups| {
            groups
                .iter()
                .filter_map(|g| str_field(g, "name"))
                .map(str::to_ascii_uppercase)
                .collect()
        })
        .unwrap_or_default();
    Some(CatalogEntry { name, locations })
}

impl Catalog for CkanCatalog {
    fn publish_dataset(
        &mut self,
        dataset: &Dataset,
        resources: &[ResourceFile],
        view: Option<&ResourceView>,
    ) -> Result<()> {
        let mut body = serde_json::to_value(dataset)?;
        body["updated_by_script"] = json!(self.updated_by_script);

        let existing = self.show("package_show", &dataset.name)?;
        let package = match existing {
            Some(old) => {
                let id = str_field(&old, "id")
                    .ok_or_else(|| anyhow!("package `{}` has no id", dataset.name))?
                    .to_string();
                body["id"] = json!(id);
                // keep the current resources; they are reconciled below
                body["resources"] = old.get("resources").cloned().unwrap_or(json!([]));
                info!(dataset = %dataset.name, "updating dataset");
                self.call("package_update", &body)?
            }
            None => {
                info!(dataset = %dataset.name, "creating dataset");
                self.call("package_create", &body)?
            }
        };
        let package_id = str_field(&package, "id")
            .ok_or_else(|| anyhow!("package `{}` has no id", dataset.name))?
            .to_string();

        let current: Vec<(String, String)> = package
            .get("resources")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|r| {
                Some((
                    str_field(r, "name")?.to_string(),
                    str_field(r, "id")?.to_string(),
                ))
            })
            .collect();
        let wanted: HashSet<&str> = resources.iter().map(|r| r.name.as_str()).collect();
        for (name, id) in &current {
            if !wanted.contains(name.as_str()) {
                warn!(dataset = %dataset.name, resource = %name, "removing resource");
                self.call("resource_delete", &json!({ "id": id }))?;
            }
        }

        let mut first_id = None;
        for file in resources {
            let existing_id = current
                .iter()
                .find(|(name, _)| *name == file.name)
                .map(|(_, id)| id.as_str());
            let result = self.upload(&package_id, existing_id, file)?;
            if first_id.is_none() {
                first_id = str_field(&result, "id").map(str::to_string);
            }
        }

        if let (Some(view), Some(resource_id)) = (view, first_id) {
            self.replace_view(&resource_id, view)?;
        }
        Ok(())
    }

    fn publish_showcase(&mut self, showcase: &Showcase, dataset_name: &str) -> Result<()> {
        let mut body = serde_json::to_value(showcase)?;
        let result = match self.show("ckanext_showcase_show", &showcase.name)? {
            Some(old) => {
                body["id"] = old.get("id").cloned().unwrap_or(Value::Null);
                self.call("ckanext_showcase_update", &body)?
            }
            None => self.call("ckanext_showcase_create", &body)?,
        };
        let showcase_id = str_field(&result, "id")
            .ok_or_else(|| anyhow!("showcase `{}` has no id", showcase.name))?
            .to_string();

        let linked = self.call(
            "ckanext_showcase_package_list",
            &json!({ "showcase_id": showcase_id }),
        )?;
        let already = linked
            .as_array()
            .into_iter()
            .flatten()
            .any(|p| str_field(p, "name") == Some(dataset_name));
        if !already {
            self.call(
                "ckanext_showcase_package_association_create",
                &json!({ "showcase_id": showcase_id, "package_id": dataset_name }),
            )?;
        }
        info!(showcase = %showcase.name, dataset = dataset_name, "showcase published");
        Ok(())
    }

    fn search_by_organization(&mut self, organization: &str) -> Result<Vec<CatalogEntry>> {
        let mut entries = Vec::new();
        let mut start = 0;
        loop {
            let result = self.call(
                "package_search",
                &json!({
                    "fq": format!("organization:{}", organization),
                    "rows": SEARCH_PAGE,
                    "start": start,
                }),
            )?;
            let page = result
                .get("results")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let n = page.len();
            entries.extend(page.iter().filter_map(entry_from_package));
            if n < SEARCH_PAGE {
                break;
            }
            start += n;
        }
        debug!(organization, count = entries.len(), "searched catalog");
        Ok(entries)
    }

    fn delete_dataset(&mut self, name: &str) -> Result<()> {
        self.call("package_delete", &json!({ "id": name }))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_from_package() {
        let pkg = json!({
            "name": "wfp-hungermap-data-for-cod",
            "groups": [{"name": "cod"}, {"name": "cog"}],
        });
        assert_eq!(
            entry_from_package(&pkg),
            Some(CatalogEntry {
                name: "wfp-hungermap-data-for-cod".into(),
                locations: vec!["COD".into(), "COG".into()],
            })
        );
        assert_eq!(
            entry_from_package(&json!({"name": "x"})).unwrap().locations,
            Vec::<String>::new()
        );
        assert_eq!(entry_from_package(&json!({"groups": []})), None);
    }

    #[test]
    fn test_not_found_detection() {
        let resp: ActionResponse = serde_json::from_value(json!({
            "success": false,
            "error": {"__type": "Not Found Error", "message": "Not found"},
        }))
        .unwrap();
        assert!(resp.is_not_found());

        let resp: ActionResponse = serde_json::from_value(json!({
            "success": false,
            "error": {"__type": "Authorization Error"},
        }))
        .unwrap();
        assert!(!resp.is_not_found());
    }

    #[test]
    fn test_action_url() {
        let c = CkanCatalog::new(
            Url::parse("https://data.humdata.org/").unwrap(),
            "key".into(),
            "test",
            "script".into(),
        )
        .unwrap();
        assert_eq!(
            c.action_url("package_show").unwrap().as_str(),
            "https://data.humdata.org/api/3/action/package_show"
        );

        let nested = CkanCatalog::new(
            Url::parse("https://example.org/ckan").unwrap(),
            "key".into(),
            "test",
            "script".into(),
        )
        .unwrap();
        assert_eq!(
            nested.action_url("package_delete").unwrap().as_str(),
            "https://example.org/ckan/api/3/action/package_delete"
        );
    }
}
