use serde::Deserialize;

#[derive(Clone, Deserialize, Debug, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum StoreConfig {
    /// Process-local store, contents are lost on restart.
    #[default]
    Memory,
    /// Memory store persisted to a JSON snapshot after every write.
    Filesystem { path: String },
}
