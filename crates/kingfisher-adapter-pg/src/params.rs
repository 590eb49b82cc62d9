//! Binding JSON values as positional statement parameters.

use serde_json::Value;
use sqlx::Arguments;
use sqlx::postgres::PgArguments;

use crate::error::PgError;

fn args_add<T>(args: &mut PgArguments, index: usize, v: T) -> Result<(), PgError>
where
    T: Send + Sync + 'static,
    for<'q> T: sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    args.add(v).map_err(|e| PgError::Parameter {
        index,
        reason: e.to_string(),
    })
}

/// Bind `params` as `$1`, `$2`, ... in order.
///
/// The Postgres type is chosen from the JSON type: integers bind as
/// `int8`, other numbers as `float8`, strings as `text`, booleans as
/// `bool` and arrays or objects as `jsonb`. Nulls bind as a text NULL,
/// which Postgres coerces to the column type.
pub fn bind_params(params: &[Value]) -> Result<PgArguments, PgError> {
    let mut args = PgArguments::default();

    for (i, value) in params.iter().enumerate() {
        let index = i + 1;
        match value {
            Value::Null => args_add(&mut args, index, Option::<String>::None)?,
            Value::Bool(b) => args_add(&mut args, index, *b)?,
            Value::Number(n) => {
                if let Some(n) = n.as_i64() {
                    args_add(&mut args, index, n)?;
                } else if let Some(n) = n.as_f64() {
                    args_add(&mut args, index, n)?;
                } else {
                    return Err(PgError::Parameter {
                        index,
                        reason: format!("number {} is out of range", n),
                    });
                }
            }
            Value::String(s) => args_add(&mut args, index, s.clone())?,
            Value::Array(_) | Value::Object(_) => {
                args_add(&mut args, index, sqlx::types::Json(value.clone()))?
            }
        }
    }

    Ok(args)
}
