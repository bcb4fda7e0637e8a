use crate::conf::ConfigError;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How galactic dust absorption is obtained for each object.
///
/// Deserialized through [`FromStr`], so an unknown name in a config file
/// surfaces as [`ConfigError::UnknownExtinctionMethod`].
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", rename_all = "snake_case")]
pub enum DustExtinction {
    /// Per-object absorption columns shipped with the catalog (SFD98-based).
    #[value(alias = "sfd98")]
    Fixed,
    /// Reddening looked up from a HEALPix dust map by sky position.
    #[value(name = "sky_map", alias = "desi")]
    SkyMap,
}

impl DustExtinction {
    pub fn as_str(&self) -> &str {
        match self {
            DustExtinction::Fixed => "fixed",
            DustExtinction::SkyMap => "sky_map",
        }
    }
}

impl std::fmt::Display for DustExtinction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DustExtinction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" | "sfd98" => Ok(DustExtinction::Fixed),
            "sky_map" | "desi" => Ok(DustExtinction::SkyMap),
            _ => Err(ConfigError::UnknownExtinctionMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for DustExtinction {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Logical combination of the halo, ghost and blooming mask bits.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskCombinator {
    /// Masked when any bit is set.
    #[default]
    Any,
    /// Masked only when every bit is set.
    All,
}

impl MaskCombinator {
    pub fn combine(&self, halo: bool, ghost: bool, blooming: bool) -> bool {
        match self {
            MaskCombinator::Any => halo || ghost || blooming,
            MaskCombinator::All => halo && ghost && blooming,
        }
    }
}

/// Tract-file schema revisions understood by the catalog adapters.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVersion {
    /// PDR3 wide forced catalog with `meas_*` morphology columns.
    #[default]
    Pdr3,
    /// S23 internal release tract files, morphology from forced photometry.
    S23,
}

impl SchemaVersion {
    pub fn as_str(&self) -> &str {
        match self {
            SchemaVersion::Pdr3 => "pdr3",
            SchemaVersion::S23 => "s23",
        }
    }
}

/// HEALPix pixel numbering scheme of a dust map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelOrdering {
    #[default]
    Ring,
    Nested,
}

/// Kind of tract file being processed.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    /// Detected objects, selected as science targets.
    #[default]
    Objects,
    /// Random points, selected for the selection-function normalization.
    Randoms,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dust_extinction_from_str() {
        assert_eq!("fixed".parse::<DustExtinction>().unwrap(), DustExtinction::Fixed);
        assert_eq!("SFD98".parse::<DustExtinction>().unwrap(), DustExtinction::Fixed);
        assert_eq!("desi".parse::<DustExtinction>().unwrap(), DustExtinction::SkyMap);
        assert_eq!("sky_map".parse::<DustExtinction>().unwrap(), DustExtinction::SkyMap);
        assert!(matches!(
            "csfd".parse::<DustExtinction>(),
            Err(ConfigError::UnknownExtinctionMethod(name)) if name == "csfd"
        ));
    }

    #[test]
    fn test_dust_extinction_value_names() {
        use clap::ValueEnum;
        for (name, expected) in [
            ("fixed", DustExtinction::Fixed),
            ("sfd98", DustExtinction::Fixed),
            ("sky_map", DustExtinction::SkyMap),
            ("desi", DustExtinction::SkyMap),
        ] {
            assert_eq!(
                <DustExtinction as ValueEnum>::from_str(name, false).unwrap(),
                expected
            );
        }
        assert!(<DustExtinction as ValueEnum>::from_str("sky-map", false).is_err());
    }

    #[test]
    fn test_mask_combinator() {
        assert!(MaskCombinator::Any.combine(false, true, false));
        assert!(!MaskCombinator::All.combine(false, true, false));
        assert!(MaskCombinator::All.combine(true, true, true));
        assert!(!MaskCombinator::Any.combine(false, false, false));
    }
}
