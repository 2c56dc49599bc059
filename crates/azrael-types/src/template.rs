use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::body::Body;
use crate::error::{AzError, AzResult};
use crate::parts::{Booster, Factory};

/// Geometry asset reference of one fragment. Opaque to the core; the blob
/// itself lives in the asset store and is referenced by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentMeta {
    pub kind: String,
    pub url: String,
}

/// An immutable blueprint for spawnable objects. The reference body's pose is
/// treated as identity; spawn overrides supply the initial pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub body: Body,
    #[serde(default)]
    pub fragments: BTreeMap<String, FragmentMeta>,
    #[serde(default)]
    pub boosters: BTreeMap<String, Booster>,
    #[serde(default)]
    pub factories: BTreeMap<String, Factory>,
}

impl Template {
    pub fn new(id: impl Into<String>, body: Body) -> Self {
        Self {
            id: id.into(),
            body,
            fragments: BTreeMap::new(),
            boosters: BTreeMap::new(),
            factories: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> AzResult<()> {
        if self.id.is_empty() {
            return Err(AzError::bad_input("template id must not be empty"));
        }
        self.body.validate()?;
        for booster in self.boosters.values() {
            booster.validate()?;
        }
        for factory in self.factories.values() {
            factory.validate()?;
        }
        Ok(())
    }
}
