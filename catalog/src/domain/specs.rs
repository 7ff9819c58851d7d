//! Category-dependent specs.
//!
//! On the wire and at rest the specs are a flat JSON object. In memory they
//! are a [`Specs`] value with one variant per [`Category`], each carrying its
//! required fields plus a shared [`SpecExtras`] map for everything else.
//! [`Specs::validate`] is the only way to build one, so holding a `Specs`
//! means the required-field rules for its category hold.
//!
//! | category | required |
//! |---|---|
//! | `VEHICULO` | `km` (number >= 0), `year` (integer) |
//! | `MAQUINARIA` | `horas` (number >= 0), `year` (integer) |
//! | `HERRAMIENTA` | `condicion` (`Nuevo` or `Usado`) |

use super::category::Category;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecsError {
    #[error("specs must be a JSON object")]
    NotAnObject,

    #[error("missing '{field}' in specs for {category}")]
    MissingField { category: Category, field: &'static str },

    #[error("invalid '{field}' in specs for {category}: {reason}")]
    InvalidField {
        category: Category,
        field: &'static str,
        reason: String,
    },
}

/// Condition of a tool listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Condition {
    Nuevo,
    Usado,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Nuevo => "Nuevo",
            Condition::Usado => "Usado",
        }
    }

    /// Case-insensitive, whitespace-tolerant match on the two literals.
    pub fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "nuevo" => Some(Condition::Nuevo),
            "usado" => Some(Condition::Usado),
            _ => None,
        }
    }
}

/// A non-negative number, kept as the JSON number it arrived as so integers
/// stay integers when written back out.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity(Number);

impl Quantity {
    pub fn as_f64(&self) -> f64 {
        // Number::as_f64 is only None for arbitrary-precision values, which we don't enable
        self.0.as_f64().unwrap_or_default()
    }

    pub fn as_number(&self) -> &Number {
        &self.0
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self(Number::from(value))
    }
}

/// Free-form attributes shared by every category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecExtras {
    /// Equipment list, always trimmed and non-empty entries
    pub equipamiento: Vec<String>,
    /// Safety feature list, always trimmed and non-empty entries
    pub seguridad: Vec<String>,
    /// Any other key the caller supplied, kept untouched
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSpecs {
    pub km: Quantity,
    pub year: i32,
    pub extras: SpecExtras,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MachinerySpecs {
    pub horas: Quantity,
    pub year: i32,
    pub extras: SpecExtras,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpecs {
    pub condicion: Condition,
    pub extras: SpecExtras,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Specs {
    Vehicle(VehicleSpecs),
    Machinery(MachinerySpecs),
    Tool(ToolSpecs),
}

impl Specs {
    /// Check `raw` against the required fields of `category` and normalize it.
    ///
    /// Numbers may be JSON numbers or numeric strings, since edit forms submit
    /// strings. `equipamiento` and `seguridad` may be comma-delimited strings
    /// or arrays; both come out as trimmed, non-empty string lists.
    pub fn validate(category: Category, raw: &Value) -> Result<Self, SpecsError> {
        let Value::Object(map) = raw else {
            return Err(SpecsError::NotAnObject);
        };
        let mut fields = map.clone();

        match category {
            Category::Vehiculo => {
                let km = take_quantity(&mut fields, category, "km")?;
                let year = take_year(&mut fields, category)?;
                let extras = SpecExtras::take(&mut fields, category)?;
                Ok(Specs::Vehicle(VehicleSpecs { km, year, extras }))
            }
            Category::Maquinaria => {
                let horas = take_quantity(&mut fields, category, "horas")?;
                let year = take_year(&mut fields, category)?;
                let extras = SpecExtras::take(&mut fields, category)?;
                Ok(Specs::Machinery(MachinerySpecs { horas, year, extras }))
            }
            Category::Herramienta => {
                let condicion = take_condition(&mut fields, category)?;
                let extras = SpecExtras::take(&mut fields, category)?;
                Ok(Specs::Tool(ToolSpecs { condicion, extras }))
            }
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Specs::Vehicle(_) => Category::Vehiculo,
            Specs::Machinery(_) => Category::Maquinaria,
            Specs::Tool(_) => Category::Herramienta,
        }
    }

    pub fn extras(&self) -> &SpecExtras {
        match self {
            Specs::Vehicle(v) => &v.extras,
            Specs::Machinery(m) => &m.extras,
            Specs::Tool(t) => &t.extras,
        }
    }

    /// Flatten back into the JSON object shape used on the wire and in the database.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        match self {
            Specs::Vehicle(v) => {
                map.insert("km".to_string(), Value::Number(v.km.as_number().clone()));
                map.insert("year".to_string(), Value::from(v.year));
            }
            Specs::Machinery(m) => {
                map.insert("horas".to_string(), Value::Number(m.horas.as_number().clone()));
                map.insert("year".to_string(), Value::from(m.year));
            }
            Specs::Tool(t) => {
                map.insert("condicion".to_string(), Value::from(t.condicion.as_str()));
            }
        }

        let extras = self.extras();
        for (key, value) in &extras.other {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
        if !extras.equipamiento.is_empty() {
            map.insert("equipamiento".to_string(), Value::from(extras.equipamiento.clone()));
        }
        if !extras.seguridad.is_empty() {
            map.insert("seguridad".to_string(), Value::from(extras.seguridad.clone()));
        }

        Value::Object(map)
    }
}

impl Serialize for Specs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl SpecExtras {
    /// Drain the list fields out of `fields` and keep whatever is left as `other`.
    fn take(fields: &mut Map<String, Value>, category: Category) -> Result<Self, SpecsError> {
        let equipamiento = take_list(fields, category, "equipamiento")?;
        let seguridad = take_list(fields, category, "seguridad")?;
        Ok(Self {
            equipamiento,
            seguridad,
            other: std::mem::take(fields),
        })
    }
}

/// Split comma-delimited text into trimmed, non-empty entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn invalid(category: Category, field: &'static str, reason: impl Into<String>) -> SpecsError {
    SpecsError::InvalidField {
        category,
        field,
        reason: reason.into(),
    }
}

/// Remove `field`, treating null and blank strings as absent.
fn take_present(fields: &mut Map<String, Value>, field: &str) -> Option<Value> {
    match fields.remove(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(value) => Some(value),
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    if let Ok(n) = raw.parse::<u64>() {
        return Some(Number::from(n));
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Some(Number::from(n));
    }
    raw.parse::<f64>().ok().and_then(Number::from_f64)
}

fn take_quantity(fields: &mut Map<String, Value>, category: Category, field: &'static str) -> Result<Quantity, SpecsError> {
    let value = take_present(fields, field).ok_or(SpecsError::MissingField { category, field })?;
    let number = match value {
        Value::Number(n) => n,
        Value::String(s) => parse_number(s.trim()).ok_or_else(|| invalid(category, field, format!("'{s}' is not a number")))?,
        other => return Err(invalid(category, field, format!("expected a number, got {other}"))),
    };

    match number.as_f64() {
        Some(v) if v >= 0.0 => Ok(Quantity(number)),
        _ => Err(invalid(category, field, "must be zero or greater")),
    }
}

fn take_year(fields: &mut Map<String, Value>, category: Category) -> Result<i32, SpecsError> {
    let value = take_present(fields, "year").ok_or(SpecsError::MissingField { category, field: "year" })?;
    let year = match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    year.and_then(|y| i32::try_from(y).ok())
        .ok_or_else(|| invalid(category, "year", format!("expected an integer, got {value}")))
}

fn take_condition(fields: &mut Map<String, Value>, category: Category) -> Result<Condition, SpecsError> {
    let value = take_present(fields, "condicion").ok_or(SpecsError::MissingField {
        category,
        field: "condicion",
    })?;

    value
        .as_str()
        .and_then(Condition::parse_loose)
        .ok_or_else(|| invalid(category, "condicion", format!("must be Nuevo or Usado, got {value}")))
}

fn take_list(fields: &mut Map<String, Value>, category: Category, field: &'static str) -> Result<Vec<String>, SpecsError> {
    match fields.remove(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(split_list(&s)),
        Some(Value::Array(items)) => {
            let mut entries = Vec::with_capacity(items.len());
            for item in items {
                let Value::String(s) = item else {
                    return Err(invalid(category, field, format!("expected a list of strings, found {item}")));
                };
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    entries.push(trimmed.to_string());
                }
            }
            Ok(entries)
        }
        Some(other) => Err(invalid(
            category,
            field,
            format!("expected a comma-separated string or a list of strings, got {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_specs(category: Category) -> Value {
        match category {
            Category::Vehiculo => json!({"km": 45000, "year": 2020}),
            Category::Maquinaria => json!({"horas": 1500, "year": 2015}),
            Category::Herramienta => json!({"condicion": "Nuevo"}),
        }
    }

    fn required_fields(category: Category) -> &'static [&'static str] {
        match category {
            Category::Vehiculo => &["km", "year"],
            Category::Maquinaria => &["horas", "year"],
            Category::Herramienta => &["condicion"],
        }
    }

    #[test]
    fn test_complete_specs_validate_for_every_category() {
        for category in Category::ALL {
            let specs = Specs::validate(category, &complete_specs(category)).unwrap();
            assert_eq!(specs.category(), category);
            assert_eq!(specs.to_value(), complete_specs(category));
        }
    }

    #[test]
    fn test_each_missing_required_field_is_named() {
        for category in Category::ALL {
            for field in required_fields(category) {
                let mut raw = complete_specs(category);
                raw.as_object_mut().unwrap().remove(*field);

                let err = Specs::validate(category, &raw).unwrap_err();
                assert_eq!(err, SpecsError::MissingField { category, field });
                let message = err.to_string();
                assert!(message.contains(&format!("'{field}'")), "{message}");
                assert!(message.contains(category.as_str()), "{message}");
            }
        }
    }

    #[test]
    fn test_vehicle_missing_km_message() {
        let err = Specs::validate(Category::Vehiculo, &json!({"year": 2020})).unwrap_err();
        assert_eq!(err.to_string(), "missing 'km' in specs for VEHICULO");
    }

    #[test]
    fn test_zero_km_is_present() {
        let specs = Specs::validate(Category::Vehiculo, &json!({"km": 0, "year": 2024})).unwrap();
        let Specs::Vehicle(vehicle) = specs else {
            panic!("expected vehicle specs");
        };
        assert_eq!(vehicle.km.as_f64(), 0.0);
    }

    #[test]
    fn test_negative_hours_rejected() {
        let err = Specs::validate(Category::Maquinaria, &json!({"horas": -3, "year": 2010})).unwrap_err();
        assert!(matches!(err, SpecsError::InvalidField { field: "horas", .. }));
    }

    #[test]
    fn test_null_and_blank_count_as_missing() {
        let err = Specs::validate(Category::Vehiculo, &json!({"km": null, "year": 2020})).unwrap_err();
        assert!(matches!(err, SpecsError::MissingField { field: "km", .. }));

        let err = Specs::validate(Category::Herramienta, &json!({"condicion": "  "})).unwrap_err();
        assert!(matches!(err, SpecsError::MissingField { field: "condicion", .. }));
    }

    #[test]
    fn test_form_strings_are_accepted() {
        let specs = Specs::validate(Category::Vehiculo, &json!({"km": "45000", "year": " 2020 "})).unwrap();
        assert_eq!(specs.to_value(), json!({"km": 45000, "year": 2020}));
    }

    #[test]
    fn test_fractional_year_rejected() {
        let err = Specs::validate(Category::Vehiculo, &json!({"km": 1, "year": 2020.5})).unwrap_err();
        assert!(matches!(err, SpecsError::InvalidField { field: "year", .. }));
    }

    #[test]
    fn test_condition_is_case_insensitive_and_canonicalized() {
        let specs = Specs::validate(Category::Herramienta, &json!({"condicion": "usado"})).unwrap();
        assert_eq!(specs.to_value(), json!({"condicion": "Usado"}));

        let err = Specs::validate(Category::Herramienta, &json!({"condicion": "roto"})).unwrap_err();
        assert!(matches!(err, SpecsError::InvalidField { field: "condicion", .. }));
    }

    #[test]
    fn test_specs_must_be_object() {
        assert_eq!(Specs::validate(Category::Vehiculo, &json!([1, 2])), Err(SpecsError::NotAnObject));
        assert_eq!(Specs::validate(Category::Herramienta, &Value::Null), Err(SpecsError::NotAnObject));
    }

    #[test]
    fn test_delimited_lists_are_normalized() {
        let raw = json!({
            "km": 10,
            "year": 2019,
            "equipamiento": "  Aire acondicionado, ,Levantavidrios ,,",
            "seguridad": [" ABS ", "", "Airbags"],
            "color": "rojo"
        });

        let specs = Specs::validate(Category::Vehiculo, &raw).unwrap();
        let extras = specs.extras();
        assert_eq!(extras.equipamiento, vec!["Aire acondicionado", "Levantavidrios"]);
        assert_eq!(extras.seguridad, vec!["ABS", "Airbags"]);
        assert_eq!(extras.other.get("color"), Some(&json!("rojo")));

        assert_eq!(
            specs.to_value(),
            json!({
                "km": 10,
                "year": 2019,
                "color": "rojo",
                "equipamiento": ["Aire acondicionado", "Levantavidrios"],
                "seguridad": ["ABS", "Airbags"]
            })
        );
    }

    #[test]
    fn test_empty_lists_are_dropped() {
        let specs = Specs::validate(Category::Herramienta, &json!({"condicion": "Nuevo", "equipamiento": " , "})).unwrap();
        assert_eq!(specs.to_value(), json!({"condicion": "Nuevo"}));
    }

    #[test]
    fn test_non_string_list_entries_rejected() {
        let err = Specs::validate(Category::Herramienta, &json!({"condicion": "Nuevo", "seguridad": ["ok", 3]})).unwrap_err();
        assert!(matches!(err, SpecsError::InvalidField { field: "seguridad", .. }));
    }

    #[test]
    fn test_serialize_matches_to_value() {
        let specs = Specs::validate(Category::Maquinaria, &json!({"horas": "1500", "year": 2015})).unwrap();
        assert_eq!(serde_json::to_value(&specs).unwrap(), json!({"horas": 1500, "year": 2015}));
    }
}
