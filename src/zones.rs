//! Zone registry for the aquifer monitoring service.
//!
//! Defines the canonical list of hydrogeological management zones served by
//! the metamodel API, along with their metadata. This is the single source
//! of truth for zone ids — all other modules should reference zones from
//! here rather than hardcoding id strings. The live listing endpoint is only
//! used by the ignored verification tests to cross-check this registry.

// ---------------------------------------------------------------------------
// Zone metadata
// ---------------------------------------------------------------------------

/// Metadata for a single aquifer zone.
pub struct Zone {
    /// Zone id as used by the API `zona` query parameter.
    pub id: &'static str,
    /// Human-readable zone name, used in chart titles.
    pub name: &'static str,
    /// Role of the zone within the aquifer system.
    pub description: &'static str,
    /// Whether the metamodel publishes balance series for this zone.
    /// Head series are available for every zone.
    pub has_balance: bool,
}

/// All zones of the modeled aquifer, ordered from the core outwards.
///
/// Ids mirror the `zona` values accepted by the metamodel endpoints; the
/// geometry feed uses the same names in its feature properties.
pub static ZONE_REGISTRY: &[Zone] = &[
    Zone {
        id: "nucleo",
        name: "Zona núcleo",
        description: "Core aquifer zone carrying most of the extraction \
                      wells. Primary reference for head evolution.",
        has_balance: true,
    },
    Zone {
        id: "marginal_norte",
        name: "Zona marginal norte",
        description: "Northern marginal zone. Exchanges flow with the core \
                      zone; balance terms are small but not negligible.",
        has_balance: true,
    },
    Zone {
        id: "marginal_sur",
        name: "Zona marginal sur",
        description: "Southern marginal zone bounding the core along the \
                      valley edge.",
        has_balance: true,
    },
    Zone {
        id: "norte",
        name: "Zona norte",
        description: "Detached northern zone at the recharge boundary of \
                      the model domain.",
        has_balance: true,
    },
];

/// Returns the ids of all registered zones.
pub fn all_zone_ids() -> Vec<&'static str> {
    ZONE_REGISTRY.iter().map(|z| z.id).collect()
}

/// Looks up a zone by id. Returns `None` if not found.
pub fn find_zone(id: &str) -> Option<&'static Zone> {
    ZONE_REGISTRY.iter().find(|z| z.id == id)
}

/// Zones expected to publish balance series.
pub fn zones_with_balance() -> Vec<&'static Zone> {
    ZONE_REGISTRY.iter().filter(|z| z.has_balance).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
