//! Parameter Assembler — typed scan configuration and its flat string map.
//!
//! [`ScannerConfig`] is the source of truth inside the bridge. It is only
//! flattened into a [`ParamMap`] at the boundary, right before the hosted
//! reader is constructed.
//!
//! ```text
//! TableFileDesc + SlotDescriptor[] + storage properties
//!        → ScannerConfig (typed)
//!        → ParamMap (string → string, sorted keys)
//! ```

use crate::error::{XscanError, XscanResult};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Prefix for every forwarded storage property.
pub const HADOOP_FS_PREFIX: &str = "hadoop_fs.";
/// Delimiter for path and column-name lists.
pub const FIELD_DELIMITER: &str = ",";
/// Delimiter for column-type lists (type names may contain commas).
pub const TYPE_DELIMITER: &str = "#";

pub const KEY_BASE_PATH: &str = "base_path";
pub const KEY_DATA_FILE_PATH: &str = "data_file_path";
pub const KEY_DATA_FILE_LENGTH: &str = "data_file_length";
pub const KEY_DELTA_FILE_PATHS: &str = "delta_file_paths";
pub const KEY_REQUIRED_FIELDS: &str = "required_fields";
pub const KEY_INSTANT_TIME: &str = "instant_time";
pub const KEY_SERDE: &str = "serde";
pub const KEY_INPUT_FORMAT: &str = "input_format";

/// `<format>_column_names`
pub fn column_names_key(format: &str) -> String {
    format!("{format}_column_names")
}

/// `<format>_column_types`
pub fn column_types_key(format: &str) -> String {
    format!("{format}_column_types")
}

/// Engine-level parameters shared by every range of one file scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileScanRangeParams {
    /// Free-form storage properties (credentials, endpoint overrides)
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl FileScanRangeParams {
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Format-specific description of one scan range: a base file plus its delta logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableFileDesc {
    /// Format identifier, also the reader registry key (e.g. "hudi")
    pub format: String,
    pub base_path: String,
    pub data_file_path: String,
    pub data_file_length: u64,
    #[serde(default)]
    pub delta_logs: Vec<String>,
    pub column_names: Vec<String>,
    /// Hosted type names, positionally aligned with `column_names`
    pub column_types: Vec<String>,
    #[serde(default)]
    pub instant_time: String,
    #[serde(default)]
    pub serde: String,
    #[serde(default)]
    pub input_format: String,
}

impl TableFileDesc {
    /// Check the invariants the assembler relies on.
    ///
    /// Assembly itself never fails; this is the gate the scanner runs before
    /// anything crosses the boundary.
    pub fn validate(&self, required_fields: &[String]) -> XscanResult<()> {
        if self.format.is_empty() {
            return Err(XscanError::Config("table format must not be empty".to_string()));
        }
        if self.column_names.len() != self.column_types.len() {
            return Err(XscanError::Config(format!(
                "{} column names but {} column types",
                self.column_names.len(),
                self.column_types.len()
            )));
        }
        let known: HashSet<&str> = self.column_names.iter().map(String::as_str).collect();
        if let Some(missing) = required_fields.iter().find(|f| !known.contains(f.as_str())) {
            return Err(XscanError::Config(format!(
                "required field '{missing}' is not a column of {}",
                self.data_file_path
            )));
        }
        Ok(())
    }
}

/// 플래너가 넘겨주는 슬롯 (출력 컬럼) 정보
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDescriptor {
    pub col_name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl SlotDescriptor {
    pub fn new(col_name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            col_name: col_name.into(),
            data_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Output schema of a scan over these slots, in slot order.
    pub fn schema_of(slots: &[SlotDescriptor]) -> SchemaRef {
        let fields: Vec<Field> = slots
            .iter()
            .map(|s| Field::new(&s.col_name, s.data_type.clone(), s.nullable))
            .collect();
        Arc::new(Schema::new(fields))
    }
}

/// Typed scanner configuration, flattened only at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    pub format: String,
    pub base_path: String,
    pub data_file_path: String,
    pub data_file_length: u64,
    pub delta_file_paths: Vec<String>,
    pub column_names: Vec<String>,
    pub column_types: Vec<String>,
    /// Projection order as requested by the consuming operator
    pub required_fields: Vec<String>,
    pub instant_time: String,
    pub serde: String,
    pub input_format: String,
    /// Un-prefixed storage properties
    pub fs_properties: BTreeMap<String, String>,
}

impl ScannerConfig {
    pub fn new(
        desc: &TableFileDesc,
        required_fields: Vec<String>,
        scan_params: &FileScanRangeParams,
    ) -> Self {
        Self {
            format: desc.format.clone(),
            base_path: desc.base_path.clone(),
            data_file_path: desc.data_file_path.clone(),
            data_file_length: desc.data_file_length,
            delta_file_paths: desc.delta_logs.clone(),
            column_names: desc.column_names.clone(),
            column_types: desc.column_types.clone(),
            required_fields,
            instant_time: desc.instant_time.clone(),
            serde: desc.serde.clone(),
            input_format: desc.input_format.clone(),
            fs_properties: scan_params.properties.clone(),
        }
    }

    /// Flatten into the string map handed to the hosted reader.
    pub fn to_param_map(&self) -> ParamMap {
        let mut params = BTreeMap::new();
        params.insert(KEY_BASE_PATH.to_string(), self.base_path.clone());
        params.insert(KEY_DATA_FILE_PATH.to_string(), self.data_file_path.clone());
        params.insert(
            KEY_DATA_FILE_LENGTH.to_string(),
            self.data_file_length.to_string(),
        );
        params.insert(
            KEY_DELTA_FILE_PATHS.to_string(),
            self.delta_file_paths.join(FIELD_DELIMITER),
        );
        params.insert(
            column_names_key(&self.format),
            self.column_names.join(FIELD_DELIMITER),
        );
        params.insert(
            column_types_key(&self.format),
            self.column_types.join(TYPE_DELIMITER),
        );
        params.insert(
            KEY_REQUIRED_FIELDS.to_string(),
            self.required_fields.join(FIELD_DELIMITER),
        );
        params.insert(KEY_INSTANT_TIME.to_string(), self.instant_time.clone());
        params.insert(KEY_SERDE.to_string(), self.serde.clone());
        params.insert(KEY_INPUT_FORMAT.to_string(), self.input_format.clone());

        // Reserved keys are never prefixed, storage keys always are.
        for (key, value) in &self.fs_properties {
            params.insert(format!("{HADOOP_FS_PREFIX}{key}"), value.clone());
        }

        ParamMap(params)
    }
}

/// Flat key/value configuration for one hosted reader instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap(BTreeMap<String, String>);

impl ParamMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Split a comma-joined list value; an empty value yields no entries.
    pub fn get_list(&self, key: &str) -> Vec<&str> {
        split_list(self.get(key).unwrap_or_default(), FIELD_DELIMITER)
    }

    /// Storage properties with the prefix stripped.
    pub fn fs_properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .filter_map(|(k, v)| k.strip_prefix(HADOOP_FS_PREFIX).map(|k| (k, v)))
    }

    /// Log-safe view with credential-looking values masked.
    pub fn redacted(&self) -> Redacted<'_> {
        Redacted(self)
    }
}

/// Split a joined list; the empty string is the empty list.
pub fn split_list<'a>(value: &'a str, delimiter: &str) -> Vec<&'a str> {
    if value.is_empty() {
        Vec::new()
    } else {
        value.split(delimiter).collect()
    }
}

const SENSITIVE_MARKERS: [&str; 6] = [
    "secret",
    "password",
    "token",
    "credential",
    "access.key",
    "access_key",
];

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_MARKERS.iter().any(|m| key.contains(m))
}

/// Display adapter returned by [`ParamMap::redacted`].
pub struct Redacted<'a>(&'a ParamMap);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if is_sensitive(key) {
                write!(f, "{key}=***")?;
            } else {
                write!(f, "{key}={value}")?;
            }
        }
        f.write_str("}")
    }
}
