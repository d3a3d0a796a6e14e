//! Canonical parameter encoding.
//!
//! Every parameter-sorting signature convention (RSA2 request signing,
//! notification verification, the legacy `key=` MD5/HMAC signatures) hashes
//! the same canonical form:
//!
//! 1. keys sorted ascending by Unicode code point,
//! 2. falsy values dropped (`""`, `null`, `0`, `false`),
//! 3. omitted fields dropped,
//! 4. values stringified (composites as compact JSON),
//! 5. `key=value` pairs joined with `&`, then trimmed.
//!
//! The falsy rule is deliberately loose: a numeric `0` or boolean `false`
//! never reaches the canonical string even when the remote side sent it.
//! Remote platforms compute their side the same way, so this must not be
//! "fixed".

use std::collections::BTreeSet;

use serde_json::Value;

/// Set of field names excluded from canonicalization.
///
/// The signature field itself is always part of it; verification paths
/// usually add the algorithm-type field as well.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OmitSet(BTreeSet<String>);

impl OmitSet {
    /// Build an omit-set from field names.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    /// An omit-set that excludes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Return a copy of this set with one more field excluded.
    pub fn with(mut self, field: impl Into<String>) -> Self {
        self.0.insert(field.into());
        self
    }

    /// Whether `field` is excluded.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    /// Iterate the excluded field names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Whether a value survives the falsy filter.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Stringify a single parameter value.
///
/// Strings are used verbatim and composites become compact JSON. Scalar
/// numbers follow ECMAScript `Number::toString` (`1.0` -> `"1"`,
/// `1e21` -> `"1e+21"`, `1e-7` -> `"1e-7"`), since the remote side builds
/// its canonical string in JavaScript. Numbers nested inside composites
/// keep `serde_json`'s rendering.
pub fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                js_number(n.as_f64().unwrap_or_default())
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// ECMAScript `Number::toString` for a finite double.
fn js_number(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    if f < 0.0 {
        return format!("-{}", js_number(-f));
    }
    // `{:e}` yields the shortest round-trip digits, e.g. `1.2345e2`.
    let sci = format!("{f:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    // Decimal point position relative to the start of `digits`.
    let n = exp.parse::<i32>().unwrap_or(0) + 1;

    if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{int}.{frac}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let (first, rest) = digits.split_at(1);
        let sign = if n > 0 { '+' } else { '-' };
        let e = (n - 1).abs();
        if rest.is_empty() {
            format!("{first}e{sign}{e}")
        } else {
            format!("{first}.{rest}e{sign}{e}")
        }
    }
}

/// Filter, stringify and sort the signable pairs of a parameter map.
///
/// This is the shared front half of [`canonicalize`] and of the
/// percent-encoded query builder, so both see exactly the same fields.
pub fn canonical_pairs<'a, I, K>(params: I, omit: &OmitSet) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, &'a Value)>,
    K: AsRef<str>,
{
    let mut pairs: Vec<(String, String)> = params
        .into_iter()
        .filter(|(key, value)| is_truthy(value) && !omit.contains(key.as_ref()))
        .map(|(key, value)| (key.as_ref().to_owned(), stringify_value(value)))
        .collect();
    // `str` ordering is byte order of UTF-8, which is code point order.
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
}

/// Build the canonical `key=value&...` string for a parameter map.
///
/// The result is a pure function of the (map, omit-set) pair: insertion
/// order of `params` never affects it.
///
/// # Arguments
/// * `params` - Any iterator of `(key, value)` pairs, e.g. `&serde_json::Map`.
/// * `omit` - Field names to exclude.
///
/// # Returns
/// The canonical string. May be empty when nothing is signable; signing
/// callers must treat that as an error.
pub fn canonicalize<'a, I, K>(params: I, omit: &OmitSet) -> String
where
    I: IntoIterator<Item = (K, &'a Value)>,
    K: AsRef<str>,
{
    canonical_pairs(params, omit)
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> serde_json::Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_sorted_and_joined() {
        let params = map(json!({"b": "2", "a": "1", "c": "3"}));
        assert_eq!(canonicalize(&params, &OmitSet::empty()), "a=1&b=2&c=3");
    }

    #[test]
    fn test_falsy_values_dropped() {
        let params = map(json!({
            "zero": 0,
            "float_zero": 0.0,
            "no": false,
            "empty": "",
            "nothing": null,
            "kept": "x",
            "one": 1,
            "yes": true
        }));
        assert_eq!(
            canonicalize(&params, &OmitSet::empty()),
            "kept=x&one=1&yes=true"
        );
    }

    #[test]
    fn test_omitted_fields_dropped() {
        let params = map(json!({"sign": "abc", "sign_type": "RSA2", "app_id": "1"}));
        let omit = OmitSet::new(["sign", "sign_type"]);
        assert_eq!(canonicalize(&params, &omit), "app_id=1");
        let omit = OmitSet::new(["sign"]);
        assert_eq!(canonicalize(&params, &omit), "app_id=1&sign_type=RSA2");
    }

    #[test]
    fn test_composite_values_are_compact_json() {
        let params = map(json!({
            "biz_content": {"out_trade_no": "T1", "total_amount": "9.90"},
            "list": [1, 2],
            "empty_list": []
        }));
        assert_eq!(
            canonicalize(&params, &OmitSet::empty()),
            r#"biz_content={"out_trade_no":"T1","total_amount":"9.90"}&empty_list=[]&list=[1,2]"#
        );
    }

    #[test]
    fn test_code_point_ordering() {
        // Upper case sorts before lower case; no locale folding.
        let params = map(json!({"b": "1", "B": "2", "_": "3", "a": "4"}));
        assert_eq!(canonicalize(&params, &OmitSet::empty()), "B=2&_=3&a=4&b=1");
    }

    #[test]
    fn test_result_is_trimmed() {
        let params = map(json!({"a": " padded ", "z": "tail "}));
        assert_eq!(canonicalize(&params, &OmitSet::empty()), "a= padded &z=tail");
    }

    #[test]
    fn test_empty_when_nothing_signable() {
        let params = map(json!({"sign": "abc", "zero": 0}));
        assert_eq!(canonicalize(&params, &OmitSet::new(["sign"])), "");
    }

    #[test]
    fn test_number_rendering() {
        assert_eq!(stringify_value(&json!(42)), "42");
        assert_eq!(stringify_value(&json!(-7)), "-7");
        assert_eq!(stringify_value(&json!(1.0)), "1");
        assert_eq!(stringify_value(&json!(9.9)), "9.9");
        assert_eq!(stringify_value(&json!(u64::MAX)), u64::MAX.to_string());
    }

    #[test]
    fn test_float_rendering_matches_javascript() {
        assert_eq!(stringify_value(&json!(123.456)), "123.456");
        assert_eq!(stringify_value(&json!(0.1)), "0.1");
        assert_eq!(stringify_value(&json!(-2.5)), "-2.5");
        assert_eq!(stringify_value(&json!(1e20)), "100000000000000000000");
        assert_eq!(stringify_value(&json!(1e21)), "1e+21");
        assert_eq!(stringify_value(&json!(-2.5e25)), "-2.5e+25");
        assert_eq!(stringify_value(&json!(0.000001)), "0.000001");
        assert_eq!(stringify_value(&json!(1e-7)), "1e-7");
        assert_eq!(stringify_value(&json!(1.5e-7)), "1.5e-7");
    }

    #[test]
    fn test_accepts_pair_iterators() {
        let a = json!("1");
        let b = json!("2");
        let pairs = vec![("b", &b), ("a", &a)];
        assert_eq!(canonicalize(pairs, &OmitSet::empty()), "a=1&b=2");
    }

    #[test]
    fn test_omit_set_builders() {
        let omit = OmitSet::new(["sign"]).with("sign_type");
        assert!(omit.contains("sign"));
        assert!(omit.contains("sign_type"));
        assert!(!omit.contains("app_id"));
        assert_eq!(omit.iter().collect::<Vec<_>>(), vec!["sign", "sign_type"]);
    }
}
