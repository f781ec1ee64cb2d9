//! Building type registry: footprint, inventory slot layout, and the unit(s)
//! spawned on completion, keyed by [`BuildingType`]. Grounded on the
//! teacher's `recipes.rs` registry style (a `HashMap`-backed catalog of
//! `Vec`-described specs with a constructor and a small validation helper),
//! generalized from crafting recipes to building definitions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The closed set of building types this catalog knows about. `sub_type` on
/// an `EntityRecord` is this enum's `u32` discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingType {
    Barrack,
    Hub,
    Warehouse,
    Workshop,
}

impl BuildingType {
    pub const ALL: [BuildingType; 4] = [
        BuildingType::Barrack,
        BuildingType::Hub,
        BuildingType::Warehouse,
        BuildingType::Workshop,
    ];

    pub fn sub_type(self) -> u32 {
        self as u32
    }

    pub fn from_sub_type(v: u32) -> Option<BuildingType> {
        Self::ALL.into_iter().find(|b| b.sub_type() == v)
    }
}

/// A single input or output slot's static capacity (§3 "Building inventory").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SlotSpec {
    pub material_type: u32,
    pub max_capacity: u32,
}

impl SlotSpec {
    pub const fn new(material_type: u32, max_capacity: u32) -> Self {
        Self {
            material_type,
            max_capacity,
        }
    }
}

/// A unit spawned on construction completion (§4.9 step 7): `unit_sub_type`
/// identifies the unit kind, `count` how many copies to place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpawnSpec {
    pub unit_sub_type: u32,
    pub count: u32,
}

/// A complete building definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingDef {
    pub building_type: BuildingType,
    /// Footprint tiles relative to the anchor tile, `(0, 0)` inclusive.
    pub footprint: Vec<(i32, i32)>,
    pub input_slots: Vec<SlotSpec>,
    pub output_slots: Vec<SlotSpec>,
    /// Total construction duration in seconds (§3 "total_duration").
    pub total_duration: f32,
    /// Units spawned once, on entering `Completed` (§4.9 step 7). Empty for
    /// building types that do not train units.
    pub spawns: Vec<SpawnSpec>,
    /// Whether this building type hosts carriers and anchors a service area
    /// (GLOSSARY "Hub").
    pub is_hub: bool,
}

impl BuildingDef {
    pub fn validate(&self) -> bool {
        !self.footprint.is_empty() && self.total_duration > 0.0
    }
}

/// Registry of building definitions, built once at startup (§10.5 — grounded
/// on `recipes.rs`'s `RecipeRegistry`-equivalent pattern, generalized to
/// buildings).
#[derive(Debug, Clone)]
pub struct BuildingCatalog {
    defs: HashMap<BuildingType, BuildingDef>,
}

impl BuildingCatalog {
    pub fn get(&self, building_type: BuildingType) -> &BuildingDef {
        self.defs
            .get(&building_type)
            .expect("catalog covers every BuildingType variant by construction")
    }

    pub fn standard() -> Self {
        let mut defs = HashMap::new();

        defs.insert(
            BuildingType::Barrack,
            BuildingDef {
                building_type: BuildingType::Barrack,
                footprint: vec![(0, 0), (1, 0), (0, 1), (1, 1)],
                input_slots: vec![SlotSpec::new(MaterialType::Wood as u32, 20)],
                output_slots: vec![],
                total_duration: 20.0,
                spawns: vec![SpawnSpec {
                    unit_sub_type: UnitType::Swordsman as u32,
                    count: 3,
                }],
                is_hub: false,
            },
        );

        defs.insert(
            BuildingType::Hub,
            BuildingDef {
                building_type: BuildingType::Hub,
                footprint: vec![(0, 0), (1, 0)],
                input_slots: vec![
                    SlotSpec::new(MaterialType::Wood as u32, 50),
                    SlotSpec::new(MaterialType::Stone as u32, 50),
                ],
                output_slots: vec![
                    SlotSpec::new(MaterialType::Wood as u32, 50),
                    SlotSpec::new(MaterialType::Stone as u32, 50),
                ],
                total_duration: 15.0,
                spawns: vec![SpawnSpec {
                    unit_sub_type: UnitType::Carrier as u32,
                    count: 2,
                }],
                is_hub: true,
            },
        );

        defs.insert(
            BuildingType::Warehouse,
            BuildingDef {
                building_type: BuildingType::Warehouse,
                footprint: vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)],
                input_slots: vec![
                    SlotSpec::new(MaterialType::Wood as u32, 200),
                    SlotSpec::new(MaterialType::Stone as u32, 200),
                    SlotSpec::new(MaterialType::Food as u32, 200),
                ],
                output_slots: vec![
                    SlotSpec::new(MaterialType::Wood as u32, 200),
                    SlotSpec::new(MaterialType::Stone as u32, 200),
                    SlotSpec::new(MaterialType::Food as u32, 200),
                ],
                total_duration: 25.0,
                spawns: vec![],
                is_hub: false,
            },
        );

        defs.insert(
            BuildingType::Workshop,
            BuildingDef {
                building_type: BuildingType::Workshop,
                footprint: vec![(0, 0), (1, 0)],
                input_slots: vec![SlotSpec::new(MaterialType::Wood as u32, 30)],
                output_slots: vec![SlotSpec::new(MaterialType::Tool as u32, 30)],
                total_duration: 18.0,
                spawns: vec![],
                is_hub: false,
            },
        );

        for def in defs.values() {
            debug_assert!(def.validate(), "building def must validate: {:?}", def.building_type);
        }

        Self { defs }
    }
}

/// A small fixed material palette, standing in for the map loader/content
/// pipeline's real material registry (out of scope here; §1 Non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum MaterialType {
    Wood = 0,
    Stone = 1,
    Food = 2,
    Tool = 3,
}

/// A small fixed unit palette, standing in for full unit content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum UnitType {
    Swordsman = 0,
    Carrier = 1,
}
