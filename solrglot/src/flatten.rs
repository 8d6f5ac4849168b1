//! Flattens search keys into a Solr query string
//!
//! The output syntax (parenthesization, `+`/`-` prefixes, `^boost`
//! placement and the `{!edismax qf=...}` local params) is what the engine
//! side depends on, so every branch here is covered by an exact-string test.

use crate::error::Error;
use crate::escape::{QueryEscaper, SolrEscaper};
use crate::field::BoostedField;
use crate::keys::{KeyExpression, KeyGroup, ParseMode, SearchKeys};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Per-query tolerances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlattenOptions {
    /// Phrase slop for the sloppy modes
    #[serde(default)]
    pub slop: Option<u32>,
    /// Edit distance for `fuzzy_terms`
    #[serde(default)]
    pub fuzzy: Option<u32>,
}

impl FlattenOptions {
    pub fn slop(slop: u32) -> Self {
        Self {
            slop: Some(slop),
            fuzzy: None,
        }
    }

    pub fn fuzzy(fuzzy: u32) -> Self {
        Self {
            slop: None,
            fuzzy: Some(fuzzy),
        }
    }
}

/// Converts [`SearchKeys`] into an engine query string
#[derive(Debug, Clone)]
pub struct KeyFlattener<E = SolrEscaper> {
    escaper: E,
}

impl Default for KeyFlattener<SolrEscaper> {
    fn default() -> Self {
        Self {
            escaper: SolrEscaper,
        }
    }
}

/// Everything that stays fixed during one tree walk
struct Walk<'a> {
    fields: &'a [BoostedField],
    mode: ParseMode,
    escaped: bool,
    sloppiness: Option<String>,
    fuzziness: Option<String>,
}

impl<E: QueryEscaper> KeyFlattener<E> {
    pub fn new(escaper: E) -> Self {
        Self { escaper }
    }

    pub fn escaper(&self) -> &E {
        &self.escaper
    }

    /// Flatten `keys` against engine field entries (`name` or `name^boost`).
    ///
    /// Fails with [`Error::IncompatibleMode`] when the mode does not accept
    /// the field list, when `edismax` meets a nested group, or when raw keys
    /// are used outside `direct` mode.
    pub fn flatten(
        &self,
        keys: &SearchKeys,
        fields: &[String],
        mode: ParseMode,
        options: &FlattenOptions,
    ) -> Result<String> {
        check_arity(fields, mode)?;

        let fields: Vec<BoostedField> = fields.iter().map(|f| BoostedField::parse(f)).collect();
        let mut walk = Walk {
            fields: &fields,
            mode,
            escaped: false,
            sloppiness: options
                .slop
                .filter(|_| mode.is_sloppy())
                .map(|slop| format!("~{}", slop)),
            fuzziness: options
                .fuzzy
                .filter(|_| mode.is_fuzzy())
                .map(|fuzzy| format!("~{}", fuzzy)),
        };

        let flat = match keys {
            SearchKeys::Raw(raw) => {
                if mode != ParseMode::Direct {
                    return Err(Error::incompatible(
                        mode,
                        "raw keys are only accepted in direct mode",
                    ));
                }
                let raw = raw.trim();
                if raw.is_empty() {
                    String::new()
                } else {
                    // raw input carries its own operators
                    join_parts("", self.emit_tokens(&[raw.to_string()], "", &walk))
                }
            }
            SearchKeys::Parsed { root, escaped } => {
                walk.escaped = *escaped;
                self.flatten_group(root, &walk)?
            }
        };

        let flat = if fields.is_empty() || flat.is_empty() {
            flat
        } else {
            require(flat)
        };
        tracing::trace!(mode = %mode, fields = fields.len(), query = %flat, "Flattened search keys");
        Ok(flat)
    }

    fn flatten_group(&self, group: &KeyGroup, walk: &Walk<'_>) -> Result<String> {
        let pre = group.conjunction.prefix();
        let neg = if group.negated { "-" } else { "" };

        let mut parts = Vec::new();
        let mut tokens = Vec::new();

        for child in &group.children {
            match child {
                KeyExpression::Group(sub) => {
                    if sub.children.is_empty() {
                        continue;
                    }
                    if walk.mode == ParseMode::Edismax {
                        return Err(Error::incompatible(
                            walk.mode,
                            "nested key groups cannot be expressed",
                        ));
                    }
                    let flat = self.flatten_group(sub, walk)?;
                    if !flat.is_empty() {
                        parts.push(nest(pre, flat));
                    }
                }
                KeyExpression::Term(term) => {
                    let term = term.trim();
                    if !term.is_empty() {
                        tokens.push(self.escape_token(term, walk));
                    }
                }
            }
        }

        if !tokens.is_empty() {
            parts.extend(self.emit_tokens(&tokens, pre, walk));
        }

        Ok(join_parts(neg, parts))
    }

    fn escape_token(&self, term: &str, walk: &Walk<'_>) -> String {
        if walk.escaped || walk.mode == ParseMode::Direct {
            term.to_string()
        } else if walk.mode.is_phrase_family() && term.contains(char::is_whitespace) {
            self.escaper.escape_phrase(term)
        } else {
            self.escaper.escape_term(term)
        }
    }

    /// Query parts for the flat token list of one group
    fn emit_tokens(&self, tokens: &[String], pre: &str, walk: &Walk<'_>) -> Vec<String> {
        match walk.mode {
            ParseMode::Keys => vec![prefixed(pre, tokens)],
            ParseMode::Edismax => {
                let qf: Vec<String> = walk.fields.iter().map(BoostedField::weighted).collect();
                vec![format!(
                    "({{!edismax qf='{}'}}{})",
                    qf.join(" "),
                    prefixed(pre, tokens)
                )]
            }
            _ => {
                let tokens: Vec<String> = tokens
                    .iter()
                    .map(|t| tolerate(t, walk.sloppiness.as_deref(), walk.fuzziness.as_deref()))
                    .collect();

                if walk.fields.is_empty() {
                    return vec![prefixed(pre, &tokens)];
                }

                let mut parts = Vec::with_capacity(walk.fields.len() + 1);

                // Every term must hit at least one field; kept in addition
                // to the per-field blocks below for broader recall.
                if walk.mode.is_terms_family() && tokens.len() > 1 && walk.fields.len() > 1 {
                    let per_term: Vec<String> = tokens
                        .iter()
                        .map(|token| {
                            let alternatives: Vec<String> = walk
                                .fields
                                .iter()
                                .map(|f| format!("{}:{}{}", f.name, token, f.boost_or_default()))
                                .collect();
                            format!("{}({})", pre, alternatives.join(" "))
                        })
                        .collect();
                    parts.push(format!("({})", per_term.join(" ")));
                }

                for field in walk.fields {
                    parts.push(format!(
                        "{}:({}){}",
                        field.name,
                        prefixed(pre, &tokens),
                        field.boost_or_default()
                    ));
                }

                parts
            }
        }
    }
}

fn check_arity(fields: &[String], mode: ParseMode) -> Result<()> {
    if mode.forbids_fields() && !fields.is_empty() {
        return Err(Error::incompatible(mode, "does not accept fields"));
    }
    if mode.requires_fields() && fields.is_empty() {
        return Err(Error::incompatible(mode, "requires at least one field"));
    }
    Ok(())
}

/// `pre tok1 pre tok2 …`
fn prefixed(pre: &str, tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| format!("{}{}", pre, t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sloppiness only on quoted multi-word phrases, fuzziness only on bare
/// single words.
fn tolerate(token: &str, sloppiness: Option<&str>, fuzziness: Option<&str>) -> String {
    let quoted = token.starts_with('"');
    let multi_word = token.contains(' ');

    match (sloppiness, fuzziness) {
        (Some(slop), _) if quoted && multi_word => format!("{}{}", token, slop),
        (_, Some(fuzzy)) if !quoted && !multi_word => format!("{}{}", token, fuzzy),
        _ => token.to_string(),
    }
}

/// A sub-group as a clause of its parent
fn nest(pre: &str, flat: String) -> String {
    if flat.starts_with('-') {
        flat
    } else {
        format!("{}({})", pre, flat)
    }
}

fn join_parts(neg: &str, parts: Vec<String>) -> String {
    match parts.len() {
        0 => String::new(),
        1 => {
            let part = parts.into_iter().next().unwrap_or_default();
            if neg.is_empty() || is_enclosed(&part) {
                format!("{}{}", neg, part)
            } else {
                format!("{}({})", neg, part)
            }
        }
        _ => format!("{}({})", neg, parts.join(" ")),
    }
}

/// Marks a top-level fielded query as required.
fn require(flat: String) -> String {
    if flat.starts_with("+(") || flat.starts_with("-(") {
        flat
    } else if is_enclosed(&flat) {
        format!("+{}", flat)
    } else {
        format!("+({})", flat)
    }
}

/// Parenthesizes a fragment unless it already is one unit.
pub fn enclose(flat: &str) -> String {
    if flat.starts_with('(') || flat.starts_with("+(") || flat.starts_with("-(") {
        flat.to_string()
    } else {
        format!("({})", flat)
    }
}

/// True when the opening parenthesis at position 0 closes at the very end.
///
/// Quoted phrases and backslash escapes are skipped.
fn is_enclosed(flat: &str) -> bool {
    if !flat.starts_with('(') {
        return false;
    }

    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in flat.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == flat.len() - 1;
                }
            }
            _ => {}
        }
    }

    false
}
