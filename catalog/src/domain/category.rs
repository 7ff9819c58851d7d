use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Listing category. Decides which specs fields are required.
///
/// The set is closed: anything else is rejected when the request body is
/// deserialized, so unknown categories never reach the specs validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Vehiculo,
    Maquinaria,
    Herramienta,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Vehiculo, Category::Maquinaria, Category::Herramienta];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Vehiculo => "VEHICULO",
            Category::Maquinaria => "MAQUINARIA",
            Category::Herramienta => "HERRAMIENTA",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_match_display() {
        for category in Category::ALL {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, serde_json::Value::String(category.to_string()));
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        assert!(serde_json::from_str::<Category>("\"INMUEBLE\"").is_err());
        assert_eq!("vehiculo".parse::<Category>(), Err(UnknownCategory("vehiculo".to_string())));
    }
}
