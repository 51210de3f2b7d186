//! The declaration surface a host test framework exposes.

use std::rc::Rc;

use serde_json::Value;

use crate::cx::Cx;
use crate::error::Result;
use crate::wrapper::TestFn;

/// Body of a table-driven test; called once per row.
pub type EachBody = Rc<dyn Fn(&Cx, &[Value]) -> Result<()>>;

/// Boxes a closure as an [`EachBody`].
pub fn each_body(body: impl Fn(&Cx, &[Value]) -> Result<()> + 'static) -> EachBody {
    Rc::new(body)
}

/// Test declaration functions of a host framework.
///
/// `timeout_ms` of `None` means the runner default.
pub trait TestApi {
    /// Declares a test.
    fn test(&mut self, name: &str, body: TestFn, timeout_ms: Option<u64>);

    /// Declares a focused test. When any test is focused, unfocused tests
    /// are skipped.
    fn only(&mut self, name: &str, body: TestFn, timeout_ms: Option<u64>);

    /// Declares a test that is reported but never run.
    fn skip(&mut self, name: &str, body: TestFn, timeout_ms: Option<u64>);

    /// Declares a placeholder test without a body.
    fn todo(&mut self, name: &str);

    /// Declares one test per row of `table`.
    ///
    /// `name` may interpolate row values: `%s` (string), `%i` (integer),
    /// `%p` (JSON), `%#` (row index) and `%%` (a literal `%`).
    fn each(&mut self, table: Vec<Vec<Value>>, name: &str, body: EachBody, timeout_ms: Option<u64>);

    /// Opens a named group.
    fn describe_start(&mut self, name: &str);

    /// Closes the innermost group.
    fn describe_end(&mut self);
}

/// Formats the name of one `each` row.
///
/// Placeholders consume row values left to right; surplus placeholders are
/// left as written.
#[must_use]
pub fn format_each_name(template: &str, row: &[Value], index: usize) -> String {
    let mut out = String::with_capacity(template.len());
    let mut values = row.iter();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(&spec) = chars.peek() else {
            out.push('%');
            break;
        };
        match spec {
            '%' => out.push('%'),
            '#' => out.push_str(&index.to_string()),
            's' | 'i' | 'p' => match values.next() {
                Some(value) => out.push_str(&render(spec, value)),
                None => {
                    out.push('%');
                    out.push(spec);
                }
            },
            _ => {
                out.push('%');
                continue;
            }
        }
        chars.next();
    }
    out
}

fn render(spec: char, value: &Value) -> String {
    match (spec, value) {
        ('s', Value::String(s)) => s.clone(),
        ('i', Value::Number(n)) => n
            .as_i64()
            .map(|i| i.to_string())
            .or_else(|| n.as_f64().map(|f| format!("{}", f.trunc())))
            .unwrap_or_else(|| n.to_string()),
        ('i', _) => "NaN".to_string(),
        ('p', v) => serde_json::to_string(v).unwrap_or_else(|_| v.to_string()),
        (_, v) => v.to_string(),
    }
}
