//! Search index mapping for VCF columns
//!
//! Chromosome and filter columns are exact-match keywords, INFO and FORMAT are
//! searchable text, and every other column is stored as non-indexed text.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::vcf::{CHROM_COL_NAME, FILTER_COL_NAME, FORMAT_COL_NAME, INFO_COL_NAME};

/// Field holding the source file name on every document
pub const FILENAME_FIELD: &str = "filename";

/// Shards per index
pub const DEFAULT_SHARD_NUM: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Keyword,
    Text,
}

/// Mapping of one document field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub index: bool,
    pub store: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlightable: Option<bool>,
}

impl FieldMapping {
    fn searchable(field_type: FieldType) -> Self {
        Self {
            field_type,
            index: true,
            store: false,
            sortable: Some(true),
            highlightable: Some(true),
        }
    }

    fn unindexed_text() -> Self {
        Self {
            field_type: FieldType::Text,
            index: false,
            store: false,
            sortable: None,
            highlightable: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mappings {
    pub properties: BTreeMap<String, FieldMapping>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerSpec {
    #[serde(rename = "type")]
    pub analyzer_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub analyzer: BTreeMap<String, AnalyzerSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    pub analysis: Analysis,
}

/// Full index definition sent to the search service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMapping {
    pub name: String,
    pub storage_type: String,
    pub shard_num: u32,
    pub mappings: Mappings,
    pub settings: IndexSettings,
}

impl IndexMapping {
    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.mappings.properties.get(name)
    }
}

/// Build the index mapping for a file's header columns
pub fn create_index_mapping_from_headers<S: AsRef<str>>(
    index_name: &str,
    headers: &[S],
) -> IndexMapping {
    let mut properties = BTreeMap::new();
    properties.insert(
        FILENAME_FIELD.to_string(),
        FieldMapping {
            field_type: FieldType::Keyword,
            index: true,
            store: false,
            sortable: None,
            highlightable: None,
        },
    );

    for header in headers.iter().map(AsRef::as_ref) {
        let field = match header {
            CHROM_COL_NAME | FILTER_COL_NAME => FieldMapping::searchable(FieldType::Keyword),
            INFO_COL_NAME | FORMAT_COL_NAME => FieldMapping::searchable(FieldType::Text),
            _ => FieldMapping::unindexed_text(),
        };
        properties.insert(header.to_string(), field);
    }

    let analyzer = BTreeMap::from([(
        "default".to_string(),
        AnalyzerSpec {
            analyzer_type: "standard".to_string(),
        },
    )]);

    IndexMapping {
        name: index_name.to_string(),
        storage_type: "disk".to_string(),
        shard_num: DEFAULT_SHARD_NUM,
        mappings: Mappings { properties },
        settings: IndexSettings {
            analysis: Analysis { analyzer },
        },
    }
}
