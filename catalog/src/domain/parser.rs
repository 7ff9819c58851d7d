//! Heuristic extraction of a listing draft from a free-text blob.
//!
//! The parser never fails. Whatever it cannot recognise simply stays in the
//! description, and the draft goes through [`Specs::validate`](super::Specs::validate)
//! like any form submission before it can be saved.

use super::category::Category;
use super::specs::Condition;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

static PRICE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\$|USD|U\$S)\s?([\d.,]+)").expect("price pattern compiles"));
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("year pattern compiles"));
static KM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)([\d.,]+)\s?(?:km|kms|mil km)").expect("km pattern compiles"));
static HOURS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)([\d.,]+)\s?(?:hs|horas)").expect("hours pattern compiles"));

/// Specs the parser could pick out. Only recognised keys are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct DraftSpecs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub km: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horas: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condicion: Option<Condition>,
}

impl DraftSpecs {
    /// Raw specs object, ready to hand to the validator.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(year) = self.year {
            map.insert("year".to_string(), Value::from(year));
        }
        if let Some(km) = self.km {
            map.insert("km".to_string(), Value::from(km));
        }
        if let Some(horas) = self.horas {
            map.insert("horas".to_string(), Value::from(horas));
        }
        if let Some(condicion) = self.condicion {
            map.insert("condicion".to_string(), Value::from(condicion.as_str()));
        }
        Value::Object(map)
    }
}

/// Unvalidated listing produced from free text.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Draft {
    pub title: String,
    /// Zero when no price was found
    #[schema(value_type = String)]
    pub price: Decimal,
    pub currency: String,
    pub category: Category,
    pub description: String,
    pub specs: DraftSpecs,
}

impl Draft {
    fn empty(currency: &str) -> Self {
        Self {
            title: String::new(),
            price: Decimal::ZERO,
            currency: currency.to_string(),
            category: Category::Vehiculo,
            description: String::new(),
            specs: DraftSpecs::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextParser {
    default_currency: String,
}

impl Default for TextParser {
    fn default() -> Self {
        Self::new("USD")
    }
}

impl TextParser {
    pub fn new(default_currency: impl Into<String>) -> Self {
        Self {
            default_currency: default_currency.into(),
        }
    }

    /// Build a draft from `text`.
    ///
    /// Lines are trimmed and blank ones dropped. The first line is the title.
    /// Every line is run through all matchers independently:
    ///
    /// - currency marker and number: price, first match only, and the line is
    ///   left out of the description. A match whose number does not parse
    ///   (`$ .`) is still left out, and the price stays open for later lines
    /// - four digit year from 1900 to 2099: `year`, later lines overwrite
    /// - number followed by `km`, `kms` or `mil km`: `km`
    /// - number followed by `hs` or `horas`: `horas`, and the category becomes MAQUINARIA
    /// - `nuevo` or `usado` anywhere: `condicion`
    ///
    /// Both `.` and `,` are dropped from numbers as grouping separators.
    pub fn parse(&self, text: &str) -> Draft {
        let mut draft = Draft::empty(&self.default_currency);
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

        let Some(first) = lines.first() else {
            return draft;
        };
        draft.title = first.to_string();

        let mut price_found = false;
        let mut description = Vec::with_capacity(lines.len());

        for line in &lines {
            let mut price_line = false;

            if !price_found && let Some(digits) = match_price(line) {
                price_line = true;
                if let Ok(price) = digits.parse::<Decimal>() {
                    draft.price = price;
                    price_found = true;
                }
            }

            if let Some(year) = YEAR_RE.find(line).and_then(|m| m.as_str().parse().ok()) {
                draft.specs.year = Some(year);
            }

            if let Some(km) = match_amount(&KM_RE, line) {
                draft.specs.km = Some(km);
            }

            if let Some(horas) = match_amount(&HOURS_RE, line) {
                draft.specs.horas = Some(horas);
                draft.category = Category::Maquinaria;
            }

            let lowered = line.to_lowercase();
            if lowered.contains("nuevo") {
                draft.specs.condicion = Some(Condition::Nuevo);
            }
            if lowered.contains("usado") {
                draft.specs.condicion = Some(Condition::Usado);
            }

            if !price_line {
                description.push(*line);
            }
        }

        draft.description = description.join("\n");
        draft
    }
}

/// Parse with the default `USD` currency.
pub fn parse(text: &str) -> Draft {
    TextParser::default().parse(text)
}

fn strip_grouping(raw: &str) -> String {
    raw.chars().filter(|c| *c != '.' && *c != ',').collect()
}

/// Digits of the first currency amount on the line, grouping removed.
fn match_price(line: &str) -> Option<String> {
    let caps = PRICE_RE.captures(line)?;
    Some(strip_grouping(caps.get(2)?.as_str()))
}

fn match_amount(re: &Regex, line: &str) -> Option<u64> {
    let caps = re.captures(line)?;
    strip_grouping(caps.get(1)?.as_str()).parse().ok()
}
