//! Rewrites relative `url` fields of a JSON payload against a base URL.

use serde_json::Value;
use url::Url;

const URL_FIELD: &str = "url";

/// Rewrite every string `url` field, at any depth, to an absolute URL
/// resolved against `base`. Already-absolute values are left unchanged;
/// values that cannot be resolved are kept as they are.
pub fn absolutize_urls(value: Value, base: &Url) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(text) if key == URL_FIELD => {
                            Value::String(resolve(base, text))
                        }
                        other => absolutize_urls(other, base),
                    };
                    (key, value)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| absolutize_urls(item, base))
                .collect(),
        ),
        other => other,
    }
}

fn resolve(base: &Url, text: String) -> String {
    match base.join(&text) {
        Ok(url) => url.into(),
        Err(_) => text,
    }
}
