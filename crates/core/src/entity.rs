//! Entities - the Assets and Shots that own tasks.

use serde::{Deserialize, Serialize};
use crate::id::EntityId;

/// The two kinds of pipeline subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// Reusable production element (character, prop, set)
    Asset,
    /// A unit of a sequence
    Shot,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asset => f.write_str("Asset"),
            Self::Shot => f.write_str("Shot"),
        }
    }
}

/// Asset subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    /// Character
    Character,
    /// Prop
    Prop,
    /// Environment / set
    Environment,
    /// Vehicle
    Vehicle,
    /// Anything the pipeline has no dedicated subtype for
    #[serde(other)]
    Other,
}

/// A link to an entity, as embedded in tasks and shot asset lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Target entity
    pub id: EntityId,

    /// Kind of the target
    #[serde(rename = "type")]
    pub entity_type: EntityType,

    /// Display code of the target
    pub code: String,
}

impl EntityRef {
    /// Create a link to an asset.
    pub fn asset(id: EntityId, code: impl Into<String>) -> Self {
        Self { id, entity_type: EntityType::Asset, code: code.into() }
    }

    /// Create a link to a shot.
    pub fn shot(id: EntityId, code: impl Into<String>) -> Self {
        Self { id, entity_type: EntityType::Shot, code: code.into() }
    }

    /// Whether the link points at a shot.
    pub fn is_shot(&self) -> bool {
        self.entity_type == EntityType::Shot
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} (#{})", self.entity_type, self.code, self.id)
    }
}

/// An Asset or Shot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier
    pub id: EntityId,

    /// Display code, e.g. `Char_Cianlu` or `Shot_sq010_050`
    pub code: String,

    /// Kind-specific data
    pub kind: EntityKind,
}

/// Kind-specific entity data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EntityKind {
    /// Asset with an optional subtype
    Asset {
        /// Character, Prop, Environment, ...
        #[serde(default)]
        asset_type: Option<AssetType>,
    },

    /// Shot with the assets it uses, in breakdown order
    Shot {
        /// Linked assets
        #[serde(default)]
        linked_assets: Vec<EntityRef>,
    },
}

impl Entity {
    /// Create an asset.
    pub fn asset(id: EntityId, code: impl Into<String>, asset_type: Option<AssetType>) -> Self {
        Self { id, code: code.into(), kind: EntityKind::Asset { asset_type } }
    }

    /// Create a shot linked to the given assets.
    pub fn shot(id: EntityId, code: impl Into<String>, linked_assets: Vec<EntityRef>) -> Self {
        Self { id, code: code.into(), kind: EntityKind::Shot { linked_assets } }
    }

    /// Kind of this entity.
    pub fn entity_type(&self) -> EntityType {
        match self.kind {
            EntityKind::Asset { .. } => EntityType::Asset,
            EntityKind::Shot { .. } => EntityType::Shot,
        }
    }

    /// Link to this entity.
    pub fn to_ref(&self) -> EntityRef {
        EntityRef {
            id: self.id,
            entity_type: self.entity_type(),
            code: self.code.clone(),
        }
    }

    /// Linked assets; always empty for an asset.
    pub fn linked_assets(&self) -> &[EntityRef] {
        match &self.kind {
            EntityKind::Asset { .. } => &[],
            EntityKind::Shot { linked_assets } => linked_assets,
        }
    }

    /// Asset subtype; always `None` for a shot.
    pub fn asset_type(&self) -> Option<AssetType> {
        match self.kind {
            EntityKind::Asset { asset_type } => asset_type,
            EntityKind::Shot { .. } => None,
        }
    }
}
