//! Typed storage strategy parameters
//!
//! Union of every parameter any storage type understands. Only the fields a
//! given type uses are populated; the rest stay `None`. Never persisted as
//! is: the binder translates it to and from `StorageConfig` rows.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageStrategyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_point: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_style: Option<String>,
    /// The only flag-typed parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Generates name-based access to the text-typed fields.
///
/// Keys are the persisted (camelCase) parameter names; the schema table in
/// `crate::schema` must list the same names.
macro_rules! text_fields {
    ($($key:literal => $field:ident),* $(,)?) => {
        impl StorageStrategyConfig {
            /// Persisted names of all text-typed fields
            pub const TEXT_KEYS: &'static [&'static str] = &[$($key),*];

            /// Borrow a text field by its persisted name
            pub fn text(&self, key: &str) -> Option<&Option<String>> {
                match key {
                    $($key => Some(&self.$field),)*
                    _ => None,
                }
            }

            /// Mutably borrow a text field by its persisted name
            pub fn text_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
                match key {
                    $($key => Some(&mut self.$field),)*
                    _ => None,
                }
            }
        }
    };
}

text_fields! {
    "endPoint" => end_point,
    "pathStyle" => path_style,
    "accessKey" => access_key,
    "secretKey" => secret_key,
    "secretId" => secret_id,
    "bucketName" => bucket_name,
    "host" => host,
    "port" => port,
    "accessToken" => access_token,
    "refreshToken" => refresh_token,
    "filePath" => file_path,
    "username" => username,
    "password" => password,
    "domain" => domain,
    "basePath" => base_path,
    "siteId" => site_id,
    "listId" => list_id,
    "siteName" => site_name,
    "siteType" => site_type,
    "region" => region,
}
