//! Conversion between [`Value`] and the Postgres wire types.
//!
//! Parameters are encoded against the type the server inferred for each
//! placeholder, so an integer value binds to `int2`, `int4` or `int8` columns
//! alike. Result columns are decoded by their declared type.

use archivedb_core::{ColumnInfo, Error, Result, Row, Timestamp, TypeError, Value};
use postgres::types::{IsNull, ToSql, Type, accepts, private::BytesMut, to_sql_checked};
use std::sync::Arc;
use std::time::SystemTime;

type BoxError = Box<dyn std::error::Error + Sync + Send>;

/// A borrowed [`Value`] bound as a statement parameter.
#[derive(Debug)]
pub struct PgValue<'a>(pub &'a Value);

fn mismatch(value: &Value, ty: &Type) -> BoxError {
    format!("cannot bind {} to a {} parameter", value.type_name(), ty).into()
}

fn encode_int(
    v: i64,
    value: &Value,
    ty: &Type,
    out: &mut BytesMut,
) -> std::result::Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        #[allow(clippy::cast_precision_loss)]
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        Type::TEXT | Type::VARCHAR => v.to_string().to_sql(ty, out),
        _ => Err(mismatch(value, ty)),
    }
}

fn is_text(ty: &Type) -> bool {
    matches!(*ty, Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME)
}

impl ToSql for PgValue<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        let value = self.0;
        match value {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) if *ty == Type::BOOL => v.to_sql(ty, out),
            Value::SmallInt(v) => encode_int(i64::from(*v), value, ty, out),
            Value::Int(v) => encode_int(i64::from(*v), value, ty, out),
            Value::BigInt(v) => encode_int(*v, value, ty, out),
            Value::Float(v) => match *ty {
                Type::FLOAT4 => v.to_sql(ty, out),
                Type::FLOAT8 => f64::from(*v).to_sql(ty, out),
                _ => Err(mismatch(value, ty)),
            },
            #[allow(clippy::cast_possible_truncation)]
            Value::Double(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => v.to_sql(ty, out),
                _ => Err(mismatch(value, ty)),
            },
            Value::Text(s) | Value::Decimal(s) => match *ty {
                Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
                _ if is_text(ty) => s.as_str().to_sql(ty, out),
                _ => Err(mismatch(value, ty)),
            },
            Value::Bytes(b) if *ty == Type::BYTEA => b.as_slice().to_sql(ty, out),
            Value::Timestamp(micros) | Value::TimestampTz(micros)
                if matches!(*ty, Type::TIMESTAMP | Type::TIMESTAMPTZ) =>
            {
                Timestamp::from_micros(*micros).to_system_time().to_sql(ty, out)
            }
            Value::Json(v) => match *ty {
                Type::JSON | Type::JSONB => v.to_sql(ty, out),
                _ if is_text(ty) => v.to_string().to_sql(ty, out),
                _ => Err(mismatch(value, ty)),
            },
            _ => Err(mismatch(value, ty)),
        }
    }

    accepts!(
        BOOL,
        INT2,
        INT4,
        INT8,
        FLOAT4,
        FLOAT8,
        TEXT,
        VARCHAR,
        BPCHAR,
        NAME,
        BYTEA,
        TIMESTAMP,
        TIMESTAMPTZ,
        JSON,
        JSONB
    );
    to_sql_checked!();
}

fn decode_error(column: &str, ty: &Type, err: &postgres::Error) -> Error {
    Error::Type(TypeError {
        expected: "a supported Postgres column type",
        actual: format!("{ty}: {err}"),
        column: Some(column.to_string()),
    })
}

/// Decode column `idx` of a driver row.
pub fn decode_value(row: &postgres::Row, idx: usize) -> Result<Value> {
    let column = &row.columns()[idx];
    let ty = column.type_();
    let err = |e: postgres::Error| decode_error(column.name(), ty, &e);

    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx).map_err(err)?.map(Value::Bool),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx).map_err(err)?.map(Value::SmallInt),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx).map_err(err)?.map(Value::Int),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx).map_err(err)?.map(Value::BigInt),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx).map_err(err)?.map(Value::Float),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map_err(err)?.map(Value::Double),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            row.try_get::<_, Option<String>>(idx).map_err(err)?.map(Value::Text)
        }
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx).map_err(err)?.map(Value::Bytes),
        Type::TIMESTAMP => row
            .try_get::<_, Option<SystemTime>>(idx)
            .map_err(err)?
            .map(|t| Value::Timestamp(Timestamp::from_system_time(t).as_micros())),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<SystemTime>>(idx)
            .map_err(err)?
            .map(|t| Value::TimestampTz(Timestamp::from_system_time(t).as_micros())),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .map_err(err)?
            .map(Value::Json),
        _ => {
            return Err(Error::Type(TypeError {
                expected: "a supported Postgres column type",
                actual: ty.to_string(),
                column: Some(column.name().to_string()),
            }));
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Decode a result set, sharing one column-name table across its rows.
pub fn decode_rows(rows: &[postgres::Row]) -> Result<Vec<Row>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let columns = Arc::new(ColumnInfo::new(
        first.columns().iter().map(|c| c.name().to_string()).collect(),
    ));

    rows.iter()
        .map(|row| {
            let values = (0..row.len())
                .map(|idx| decode_value(row, idx))
                .collect::<Result<Vec<_>>>()?;
            Ok(Row::with_columns(Arc::clone(&columns), values))
        })
        .collect()
}
