use std::collections::BTreeMap;
use std::fmt;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{multispace0, multispace1};
use nom::number::complete::double;
use nom::sequence::tuple;
use nom::IResult;

use crate::error::{Error, Result};

#[cfg(test)]
mod tests;

/// A typed option value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OptValue {
    Bool(bool),
    Int(i64),
    Decimal(f64),
    Str(String),
    List(Vec<String>),
}

impl OptValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            OptValue::Bool(_) => "bool",
            OptValue::Int(_) => "int",
            OptValue::Decimal(_) => "decimal",
            OptValue::Str(_) => "string",
            OptValue::List(_) => "list",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric reading: both `Int` and `Decimal` qualify.
    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            OptValue::Int(value) => Some(*value as f64),
            OptValue::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            OptValue::List(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for OptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptValue::Bool(value) => write!(f, "{value}"),
            OptValue::Int(value) => write!(f, "{value}"),
            OptValue::Decimal(value) => write!(f, "{value}"),
            OptValue::Str(value) => write!(f, "{value}"),
            OptValue::List(values) => write!(f, "{}", values.join(",")),
        }
    }
}

impl From<bool> for OptValue {
    fn from(value: bool) -> Self {
        OptValue::Bool(value)
    }
}

impl From<i64> for OptValue {
    fn from(value: i64) -> Self {
        OptValue::Int(value)
    }
}

impl From<f64> for OptValue {
    fn from(value: f64) -> Self {
        OptValue::Decimal(value)
    }
}

impl From<&str> for OptValue {
    fn from(value: &str) -> Self {
        OptValue::Str(value.to_string())
    }
}

impl From<String> for OptValue {
    fn from(value: String) -> Self {
        OptValue::Str(value)
    }
}

impl From<Vec<String>> for OptValue {
    fn from(value: Vec<String>) -> Self {
        OptValue::List(value)
    }
}

type Validator = Box<dyn Fn(&OptValue) -> std::result::Result<(), String> + Send + Sync>;

struct OptSpec {
    description: String,
    value: OptValue,
    validators: Vec<Validator>,
}

/// The named, typed, validated options of a processor.
///
/// Every option has a default fixing its type; setting a value of another
/// type, an unknown option, or a value rejected by a validator is an error
/// surfaced to the caller.
#[derive(Default)]
pub struct Options {
    prefix: String,
    specs: BTreeMap<String, OptSpec>,
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("prefix", &self.prefix)
            .field("names", &self.specs.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the prefix reported by [`Options::opt_prefixed`], letting a
    /// parent expose a child's options under distinct names.
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn opt_prefixed(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Declares an option with its description and default value.
    pub fn add_opt(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        default: impl Into<OptValue>,
    ) {
        self.specs.insert(
            name.into(),
            OptSpec {
                description: description.into(),
                value: default.into(),
                validators: Vec::new(),
            },
        );
    }

    /// Attaches a validator predicate; the message is shown on rejection.
    pub fn add_opt_check(
        &mut self,
        name: &str,
        check: impl Fn(&OptValue) -> std::result::Result<(), String> + Send + Sync + 'static,
    ) {
        let spec = self
            .specs
            .get_mut(name)
            .unwrap_or_else(|| panic!("unknown option {name:?}"));
        spec.validators.push(Box::new(check));
    }

    /// Attaches a rule such as `"max-matches >= 1"`; the named option must
    /// already be declared and carry a numeric type.
    pub fn add_opt_rule(&mut self, rule: &str) -> Result<()> {
        let (name, op, bound) = parse_rule(rule)
            .map_err(|_| Error::malformed("option rule", rule))
            .map(|(_, parsed)| parsed)?;
        let name = name.to_string();
        if !self.specs.contains_key(&name) {
            return Err(Error::UnknownOption(name));
        }
        let rule_text = rule.trim().to_string();
        self.add_opt_check(&name, move |value| {
            let value = value
                .as_decimal()
                .ok_or_else(|| format!("{value} is not numeric"))?;
            let holds = match op {
                RuleOp::Lt => value < bound,
                RuleOp::Le => value <= bound,
                RuleOp::Gt => value > bound,
                RuleOp::Ge => value >= bound,
                RuleOp::Eq => value == bound,
                RuleOp::Ne => value != bound,
            };
            if holds {
                Ok(())
            } else {
                Err(format!("rule '{rule_text}' does not hold"))
            }
        });
        Ok(())
    }

    pub fn has_opt(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn opt_description(&self, name: &str) -> Option<&str> {
        self.specs.get(name).map(|spec| spec.description.as_str())
    }

    /// The current value of an option.
    pub fn opt_value(&self, name: &str) -> Result<&OptValue> {
        self.specs
            .get(name)
            .map(|spec| &spec.value)
            .ok_or_else(|| Error::UnknownOption(name.to_string()))
    }

    /// Sets an option, checking the type against the default and running
    /// every validator.
    pub fn set_opt_value(&mut self, name: &str, value: impl Into<OptValue>) -> Result<()> {
        let value = value.into();
        let spec = self
            .specs
            .get_mut(name)
            .ok_or_else(|| Error::UnknownOption(name.to_string()))?;
        if spec.value.type_name() != value.type_name() {
            return Err(Error::OptionValidation {
                option: name.to_string(),
                message: format!(
                    "expected {}, got {}",
                    spec.value.type_name(),
                    value.type_name()
                ),
            });
        }
        for validator in &spec.validators {
            if let Err(message) = validator(&value) {
                return Err(Error::OptionValidation {
                    option: name.to_string(),
                    message,
                });
            }
        }
        spec.value = value;
        Ok(())
    }

    pub fn opt_bool(&self, name: &str) -> Result<bool> {
        self.typed(name, OptValue::as_bool)
    }

    pub fn opt_int(&self, name: &str) -> Result<i64> {
        self.typed(name, OptValue::as_int)
    }

    pub fn opt_decimal(&self, name: &str) -> Result<f64> {
        self.typed(name, OptValue::as_decimal)
    }

    pub fn opt_str(&self, name: &str) -> Result<String> {
        self.typed(name, |value| value.as_str().map(str::to_string))
    }

    pub fn opt_list(&self, name: &str) -> Result<Vec<String>> {
        self.typed(name, |value| value.as_list().map(<[String]>::to_vec))
    }

    fn typed<T>(&self, name: &str, read: impl Fn(&OptValue) -> Option<T>) -> Result<T> {
        let value = self.opt_value(name)?;
        read(value).ok_or_else(|| Error::OptionValidation {
            option: name.to_string(),
            message: format!("unexpected type {}", value.type_name()),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Copies the value of `name` from `other` if both declare it. Used to
    /// bind a child's option to its parent's value (and back, on exit).
    pub fn bind_from(&mut self, other: &Options, name: &str) -> Result<()> {
        if self.has_opt(name) && other.has_opt(name) {
            let value = other.opt_value(name)?.clone();
            self.set_opt_value(name, value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum RuleOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

fn parse_op(input: &str) -> IResult<&str, RuleOp> {
    alt((
        nom::combinator::value(RuleOp::Le, tag("<=")),
        nom::combinator::value(RuleOp::Ge, tag(">=")),
        nom::combinator::value(RuleOp::Eq, tag("==")),
        nom::combinator::value(RuleOp::Ne, tag("!=")),
        nom::combinator::value(RuleOp::Lt, tag("<")),
        nom::combinator::value(RuleOp::Gt, tag(">")),
    ))(input)
}

fn parse_rule(input: &str) -> IResult<&str, (&str, RuleOp, f64)> {
    let (input, _) = multispace0(input)?;
    let (input, name) = nom::bytes::complete::take_till1(|c: char| c.is_whitespace())(input)?;
    let (input, (_, op, _, bound)) = tuple((multispace1, parse_op, multispace0, double))(input)?;
    Ok((input, (name, op, bound)))
}
