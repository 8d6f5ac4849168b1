//! Filter conditions and their Solr filter-query rendering

use crate::codec;
use crate::error::Error;
use crate::escape::{QueryEscaper, SolrEscaper};
use crate::keys::Conjunction;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Comparison applied by a [`Condition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Operator {
    #[default]
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "BETWEEN")]
    Between,
    #[serde(rename = "NOT BETWEEN")]
    NotBetween,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "=" => Ok(Operator::Eq),
            "<>" | "!=" => Ok(Operator::NotEq),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Lte),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Gte),
            "IN" => Ok(Operator::In),
            "NOT IN" => Ok(Operator::NotIn),
            "BETWEEN" => Ok(Operator::Between),
            "NOT BETWEEN" => Ok(Operator::NotBetween),
            _ => Err(Error::UnknownOperator(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Single(String),
    List(Vec<String>),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Single(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Single(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        FilterValue::List(values)
    }
}

/// `field <operator> value`; a missing value means NULL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    #[serde(default)]
    pub value: Option<FilterValue>,
    #[serde(default)]
    pub operator: Operator,
}

impl Condition {
    pub fn new(field: impl Into<String>, value: Option<FilterValue>, operator: Operator) -> Self {
        Self {
            field: field.into(),
            value,
            operator,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Some(value.into()), Operator::Eq)
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, None, Operator::Eq)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionItem {
    Condition(Condition),
    Group(ConditionGroup),
}

impl From<Condition> for ConditionItem {
    fn from(condition: Condition) -> Self {
        ConditionItem::Condition(condition)
    }
}

impl From<ConditionGroup> for ConditionItem {
    fn from(group: ConditionGroup) -> Self {
        ConditionItem::Group(group)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(default)]
    pub conjunction: Conjunction,
    #[serde(default)]
    pub items: Vec<ConditionItem>,
}

impl ConditionGroup {
    pub fn new(conjunction: Conjunction) -> Self {
        Self {
            conjunction,
            items: Vec::new(),
        }
    }

    pub fn and(items: Vec<ConditionItem>) -> Self {
        Self {
            conjunction: Conjunction::And,
            items,
        }
    }

    pub fn or(items: Vec<ConditionItem>) -> Self {
        Self {
            conjunction: Conjunction::Or,
            items,
        }
    }

    pub fn add(mut self, item: impl Into<ConditionItem>) -> Self {
        self.items.push(item.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Whether a clause must or must not match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occur {
    Must,
    MustNot,
}

/// Renders condition groups to Solr `fq` strings.
///
/// Conditions name fields by their index identifier; `field_names` maps
/// those to engine names. Unmapped identifiers are encoded with the codec.
#[derive(Debug, Clone)]
pub struct FilterQueryBuilder<E = SolrEscaper> {
    escaper: E,
}

impl Default for FilterQueryBuilder<SolrEscaper> {
    fn default() -> Self {
        Self {
            escaper: SolrEscaper,
        }
    }
}

impl<E: QueryEscaper> FilterQueryBuilder<E> {
    pub fn new(escaper: E) -> Self {
        Self { escaper }
    }

    /// One filter query per top-level item of an AND group; an OR group
    /// becomes a single filter query.
    pub fn filter_queries(
        &self,
        group: &ConditionGroup,
        field_names: &BTreeMap<String, String>,
    ) -> Result<Vec<String>> {
        if group.is_empty() {
            return Ok(Vec::new());
        }
        if group.conjunction == Conjunction::Or {
            return Ok(vec![self.render_group(group, field_names)?]);
        }

        let mut fq = group
            .items
            .iter()
            .map(|item| self.render_item(item, Conjunction::And, field_names))
            .collect::<Result<Vec<_>>>()?;
        fq.retain(|f| !f.is_empty());
        Ok(fq)
    }

    /// A whole group as one query fragment (without outer parentheses)
    pub fn render_group(
        &self,
        group: &ConditionGroup,
        field_names: &BTreeMap<String, String>,
    ) -> Result<String> {
        let mut clauses = group
            .items
            .iter()
            .map(|item| self.render_item(item, group.conjunction, field_names))
            .collect::<Result<Vec<_>>>()?;
        clauses.retain(|clause| !clause.is_empty());
        Ok(clauses.join(" "))
    }

    /// OR-combine filter fragments: `(a) (b)`
    pub fn combine_or(fragments: &[String]) -> String {
        match fragments {
            [] => String::new(),
            [single] => single.clone(),
            _ => fragments
                .iter()
                .map(|f| format!("({})", f))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    fn render_item(
        &self,
        item: &ConditionItem,
        parent: Conjunction,
        field_names: &BTreeMap<String, String>,
    ) -> Result<String> {
        match item {
            ConditionItem::Condition(condition) => {
                let (occur, clause) = self.render_condition(condition, field_names)?;
                Ok(match (parent, occur) {
                    (Conjunction::And, Occur::Must) => format!("+{}", clause),
                    (Conjunction::And, Occur::MustNot) => format!("-{}", clause),
                    (Conjunction::Or, Occur::Must) => clause,
                    // a purely negative clause needs something to subtract from
                    (Conjunction::Or, Occur::MustNot) => format!("(*:* -{})", clause),
                })
            }
            ConditionItem::Group(group) => {
                let inner = self.render_group(group, field_names)?;
                if inner.is_empty() {
                    return Ok(String::new());
                }
                Ok(format!("{}({})", parent.prefix(), inner))
            }
        }
    }

    fn render_condition(
        &self,
        condition: &Condition,
        field_names: &BTreeMap<String, String>,
    ) -> Result<(Occur, String)> {
        let field = field_names
            .get(&condition.field)
            .cloned()
            .unwrap_or_else(|| codec::encode(&condition.field));

        let value = match &condition.value {
            None => {
                return match condition.operator {
                    Operator::Eq => Ok((Occur::MustNot, format!("{}:[* TO *]", field))),
                    Operator::NotEq => Ok((Occur::Must, format!("{}:[* TO *]", field))),
                    op => Err(Error::invalid_filter(
                        &condition.field,
                        format!("operator {} needs a value", op),
                    )),
                };
            }
            Some(value) => value,
        };

        let quoted = |v: &str| self.escaper.escape_phrase(v);

        match condition.operator {
            Operator::Eq | Operator::NotEq => {
                let single = single_value(condition, value)?;
                let occur = if condition.operator == Operator::Eq {
                    Occur::Must
                } else {
                    Occur::MustNot
                };
                Ok((occur, format!("{}:{}", field, quoted(single))))
            }
            Operator::Lt => Ok((
                Occur::Must,
                format!("{}:{{* TO {}}}", field, quoted(single_value(condition, value)?)),
            )),
            Operator::Lte => Ok((
                Occur::Must,
                format!("{}:[* TO {}]", field, quoted(single_value(condition, value)?)),
            )),
            Operator::Gt => Ok((
                Occur::Must,
                format!("{}:{{{} TO *}}", field, quoted(single_value(condition, value)?)),
            )),
            Operator::Gte => Ok((
                Occur::Must,
                format!("{}:[{} TO *]", field, quoted(single_value(condition, value)?)),
            )),
            Operator::In | Operator::NotIn => {
                let values = list_value(condition, value)?;
                if values.is_empty() {
                    return Err(Error::invalid_filter(
                        &condition.field,
                        format!("operator {} needs at least one value", condition.operator),
                    ));
                }
                let alternatives: Vec<String> = values.iter().map(|v| quoted(v)).collect();
                let occur = if condition.operator == Operator::In {
                    Occur::Must
                } else {
                    Occur::MustNot
                };
                Ok((occur, format!("{}:({})", field, alternatives.join(" "))))
            }
            Operator::Between | Operator::NotBetween => {
                let values = list_value(condition, value)?;
                let [min, max] = values else {
                    return Err(Error::invalid_filter(
                        &condition.field,
                        format!("operator {} needs exactly two values", condition.operator),
                    ));
                };
                let occur = if condition.operator == Operator::Between {
                    Occur::Must
                } else {
                    Occur::MustNot
                };
                Ok((
                    occur,
                    format!("{}:[{} TO {}]", field, quoted(min), quoted(max)),
                ))
            }
        }
    }
}

fn single_value<'a>(condition: &Condition, value: &'a FilterValue) -> Result<&'a str> {
    match value {
        FilterValue::Single(v) => Ok(v),
        FilterValue::List(_) => Err(Error::invalid_filter(
            &condition.field,
            format!("operator {} needs a single value", condition.operator),
        )),
    }
}

fn list_value<'a>(condition: &Condition, value: &'a FilterValue) -> Result<&'a [String]> {
    match value {
        FilterValue::List(values) => Ok(values),
        FilterValue::Single(_) => Err(Error::invalid_filter(
            &condition.field,
            format!("operator {} needs a list of values", condition.operator),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> BTreeMap<String, String> {
        let mut names = BTreeMap::new();
        names.insert("title".to_string(), "tm_title".to_string());
        names.insert("type".to_string(), "ss_type".to_string());
        names.insert("created".to_string(), "ds_created".to_string());
        names
    }

    fn render(condition: Condition) -> Result<Vec<String>> {
        FilterQueryBuilder::default()
            .filter_queries(&ConditionGroup::and(vec![condition.into()]), &names())
    }

    #[test]
    fn test_equality() {
        assert_eq!(render(Condition::eq("type", "article")).unwrap(), vec!["+ss_type:\"article\""]);
    }

    #[test]
    fn test_not_equal() {
        let c = Condition::new("type", Some("page".into()), Operator::NotEq);
        assert_eq!(render(c).unwrap(), vec!["-ss_type:\"page\""]);
    }

    #[test]
    fn test_null_values() {
        assert_eq!(render(Condition::is_null("type")).unwrap(), vec!["-ss_type:[* TO *]"]);
        let c = Condition::new("type", None, Operator::NotEq);
        assert_eq!(render(c).unwrap(), vec!["+ss_type:[* TO *]"]);
        let c = Condition::new("type", None, Operator::Gt);
        assert!(render(c).is_err());
    }

    #[test]
    fn test_ranges() {
        let cases = [
            (Operator::Lt, "+ds_created:{* TO \"5\"}"),
            (Operator::Lte, "+ds_created:[* TO \"5\"]"),
            (Operator::Gt, "+ds_created:{\"5\" TO *}"),
            (Operator::Gte, "+ds_created:[\"5\" TO *]"),
        ];
        for (op, expected) in cases {
            let c = Condition::new("created", Some("5".into()), op);
            assert_eq!(render(c).unwrap(), vec![expected], "operator {}", op);
        }
    }

    #[test]
    fn test_between() {
        let values = vec!["1".to_string(), "9".to_string()];
        let c = Condition::new("created", Some(values.clone().into()), Operator::Between);
        assert_eq!(render(c).unwrap(), vec!["+ds_created:[\"1\" TO \"9\"]"]);

        let c = Condition::new("created", Some(values.into()), Operator::NotBetween);
        assert_eq!(render(c).unwrap(), vec!["-ds_created:[\"1\" TO \"9\"]"]);

        let c = Condition::new("created", Some(vec!["1".to_string()].into()), Operator::Between);
        assert!(render(c).is_err());
    }

    #[test]
    fn test_in_lists() {
        let values = vec!["a".to_string(), "b c".to_string()];
        let c = Condition::new("type", Some(values.clone().into()), Operator::In);
        assert_eq!(render(c).unwrap(), vec!["+ss_type:(\"a\" \"b c\")"]);

        let c = Condition::new("type", Some(values.into()), Operator::NotIn);
        assert_eq!(render(c).unwrap(), vec!["-ss_type:(\"a\" \"b c\")"]);

        let c = Condition::new("type", Some("a".into()), Operator::In);
        assert!(render(c).is_err());
    }

    #[test]
    fn test_unmapped_field_is_encoded() {
        assert_eq!(
            render(Condition::eq("ss_entity:type", "x")).unwrap(),
            vec!["+ss_entity_X3a_type:\"x\""]
        );
    }

    #[test]
    fn test_one_filter_query_per_and_item() {
        let group = ConditionGroup::and(vec![
            Condition::eq("type", "article").into(),
            Condition::eq("title", "foo").into(),
        ]);
        let fq = FilterQueryBuilder::default()
            .filter_queries(&group, &names())
            .unwrap();
        assert_eq!(fq, vec!["+ss_type:\"article\"", "+tm_title:\"foo\""]);
    }

    #[test]
    fn test_or_group_is_single_filter_query() {
        let group = ConditionGroup::or(vec![
            Condition::eq("type", "article").into(),
            Condition::new("type", Some("page".into()), Operator::NotEq).into(),
        ]);
        let fq = FilterQueryBuilder::default()
            .filter_queries(&group, &names())
            .unwrap();
        assert_eq!(fq, vec!["ss_type:\"article\" (*:* -ss_type:\"page\")"]);
    }

    #[test]
    fn test_nested_groups() {
        let group = ConditionGroup::and(vec![
            Condition::eq("type", "article").into(),
            ConditionGroup::or(vec![
                Condition::eq("title", "a").into(),
                Condition::eq("title", "b").into(),
            ])
            .into(),
        ]);
        let rendered = FilterQueryBuilder::default()
            .render_group(&group, &names())
            .unwrap();
        assert_eq!(rendered, "+ss_type:\"article\" +(tm_title:\"a\" tm_title:\"b\")");
    }

    #[test]
    fn test_combine_or() {
        type B = FilterQueryBuilder;
        assert_eq!(B::combine_or(&[]), "");
        assert_eq!(B::combine_or(&["+a:1".to_string()]), "+a:1");
        assert_eq!(
            B::combine_or(&["+a:1 +b:2".to_string(), "+a:3".to_string()]),
            "(+a:1 +b:2) (+a:3)"
        );
    }

    #[test]
    fn test_operator_from_str() {
        assert_eq!("not in".parse::<Operator>().unwrap(), Operator::NotIn);
        assert_eq!("!=".parse::<Operator>().unwrap(), Operator::NotEq);
        assert!("LIKE".parse::<Operator>().is_err());
    }
}
