//! Placeholder counting and formal parameter mapping

use tracing::{debug, trace};

use crate::{
    Charset, MaxLength, ParamError, ParamValue, ParameterListItem, ServerProfile, SqlType,
    TdsVersion,
};

/// Count `?` placeholders outside single-quoted literals
///
/// A doubled quote inside a literal closes and immediately reopens it, so
/// escaped quotes need no special handling.
pub fn count_parameters(sql: &str) -> usize {
    let mut in_string = false;
    let mut count = 0;
    for ch in sql.chars() {
        match (in_string, ch) {
            (false, '?') => count += 1,
            (_, '\'') => in_string = !in_string,
            _ => {}
        }
    }
    count
}

/// Check that every input parameter has a value
///
/// Output parameters are marked set as a side effect.
pub fn verify_parameters_set(params: &mut [ParameterListItem]) -> Result<(), ParamError> {
    for (i, param) in params.iter_mut().enumerate() {
        if param.is_output {
            param.is_set = true;
        }
        if !param.is_set {
            return Err(ParamError::NotSet { index: i + 1 });
        }
    }
    Ok(())
}

/// Assign formal names, types and lengths using a server profile
pub fn create_parameter_mapping(
    sql: &str,
    params: &mut [ParameterListItem],
    profile: &ServerProfile,
) -> Result<(), ParamError> {
    map_parameters(sql, params, profile.version, profile.use_unicode(), &profile.charset)
}

/// Assign formal names, types and lengths
///
/// Names run `P1, P2, ...`, skipping any candidate that already occurs in
/// the SQL text so the generated procedure cannot shadow an identifier.
pub fn map_parameters(
    sql: &str,
    params: &mut [ParameterListItem],
    version: TdsVersion,
    unicode: bool,
    charset: &dyn Charset,
) -> Result<(), ParamError> {
    let mut next_number = 0;

    for (i, param) in params.iter_mut().enumerate() {
        let index = i + 1;
        let name = loop {
            next_number += 1;
            let candidate = format!("P{}", next_number);
            if !sql.contains(&candidate) {
                break candidate;
            }
            debug!(%candidate, "formal name occurs in statement, skipping");
        };

        let (formal_type, max_length) = formal_type_for(index, param, version, unicode, charset)?;
        trace!(index, %name, formal_type = %formal_type, "mapped parameter");

        param.formal_name = Some(name);
        param.formal_type = Some(formal_type);
        if max_length.is_some() {
            param.max_length = max_length;
        }
    }
    Ok(())
}

fn formal_type_for(
    index: usize,
    param: &ParameterListItem,
    version: TdsVersion,
    unicode: bool,
    charset: &dyn Charset,
) -> Result<(String, Option<MaxLength>), ParamError> {
    match param.sql_type {
        SqlType::Varchar | SqlType::Char => {
            let value = match &param.value {
                ParamValue::Null => None,
                ParamValue::Text(s) => Some(s.as_str()),
                other => {
                    return Err(ParamError::ValueType {
                        index,
                        expected: "Text",
                        found: other.type_name(),
                    })
                }
            };
            Ok(character_type(value, version, unicode, charset))
        }
        SqlType::LongVarchar => {
            let name = if version.supports_unicode() { "ntext" } else { "text" };
            Ok((name.to_string(), Some(MaxLength::Unbounded)))
        }
        SqlType::Integer => fixed("integer"),
        SqlType::Float | SqlType::Real => fixed("real"),
        SqlType::Double => fixed("float"),
        SqlType::Timestamp | SqlType::Date | SqlType::Time => fixed("datetime"),
        SqlType::LongVarbinary | SqlType::Varbinary => fixed("image"),
        SqlType::Bit => fixed("bit"),
        SqlType::BigInt | SqlType::Decimal | SqlType::Numeric => fixed("decimal(38,10)"),
        SqlType::SmallInt => fixed("smallint"),
        SqlType::TinyInt => fixed("tinyint"),
        SqlType::Binary | SqlType::Null | SqlType::Other => Err(ParamError::NotImplemented {
            index,
            sql_type: param.sql_type,
        }),
    }
}

fn fixed(name: &str) -> Result<(String, Option<MaxLength>), ParamError> {
    Ok((name.to_string(), None))
}

/// Pick the character type; lengths count UTF-16 code units as the server does
fn character_type(
    value: Option<&str>,
    version: TdsVersion,
    unicode: bool,
    charset: &dyn Charset,
) -> (String, Option<MaxLength>) {
    let units = value.map(|s| s.encode_utf16().count());

    if version.supports_unicode() {
        if unicode && units.map_or(true, |n| n < 4001) {
            return ("nvarchar(4000)".to_string(), Some(MaxLength::Bounded(4000)));
        }
        let fits_varchar = match (value, units) {
            (Some(s), Some(n)) => n < 8001 && !charset.is_dbcs() && charset.can_encode(s),
            _ => true,
        };
        if fits_varchar {
            return ("varchar(8000)".to_string(), Some(MaxLength::Bounded(8000)));
        }
        return ("ntext".to_string(), Some(MaxLength::Unbounded));
    }

    let mut len = units.unwrap_or(0);
    if let Some(s) = value {
        if charset.is_dbcs() && len > 127 && len < 256 {
            len = charset.encoded_len(s);
        }
    }
    if len < 256 {
        ("varchar(255)".to_string(), Some(MaxLength::Bounded(255)))
    } else {
        ("text".to_string(), Some(MaxLength::Unbounded))
    }
}

/// Render the declaration list, e.g. `@P1 integer, @P2 datetime output`
pub fn declarations(params: &[ParameterListItem]) -> Result<String, ParamError> {
    let mut parts = Vec::with_capacity(params.len());
    for (i, param) in params.iter().enumerate() {
        let (name, formal_type) = match (&param.formal_name, &param.formal_type) {
            (Some(name), Some(formal_type)) => (name, formal_type),
            _ => return Err(ParamError::Unmapped { index: i + 1 }),
        };
        let mut decl = format!("@{} {}", name, formal_type);
        if param.is_output {
            decl.push_str(" output");
        }
        parts.push(decl);
    }
    Ok(parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CharsetKind;
    use datewire_core::Temporal;

    fn profile(version: TdsVersion, unicode: bool, charset: CharsetKind) -> ServerProfile {
        ServerProfile::new(version, unicode, charset)
    }

    fn text_param(len: usize) -> ParameterListItem {
        ParameterListItem::bound(SqlType::Varchar, "x".repeat(len))
    }

    fn map_one(param: ParameterListItem, profile: &ServerProfile) -> ParameterListItem {
        let mut params = [param];
        create_parameter_mapping("select ?", &mut params, profile).unwrap();
        let [param] = params;
        param
    }

    #[test]
    fn test_count_parameters() {
        assert_eq!(count_parameters("select * from t where a = ? and b = ?"), 2);
        assert_eq!(count_parameters("select '?' from t where a = ?"), 1);
        assert_eq!(count_parameters("select 'it''s ?' from t where a = ?"), 1);
        assert_eq!(count_parameters(""), 0);
        assert_eq!(count_parameters("'unterminated ?"), 0);
    }

    #[test]
    fn test_verify_parameters_set() {
        let mut params = vec![
            ParameterListItem::bound(SqlType::Integer, 1),
            ParameterListItem::output(SqlType::Integer),
        ];
        assert_eq!(verify_parameters_set(&mut params), Ok(()));
        assert!(params[1].is_set);

        params.push(ParameterListItem::new(SqlType::Varchar));
        params.push(ParameterListItem::new(SqlType::Varchar));
        assert_eq!(verify_parameters_set(&mut params), Err(ParamError::NotSet { index: 3 }));
    }

    #[test]
    fn test_formal_names_skip_sql_substrings() {
        let mut params = vec![
            ParameterListItem::bound(SqlType::Integer, 1),
            ParameterListItem::bound(SqlType::Integer, 2),
            ParameterListItem::bound(SqlType::Integer, 3),
        ];
        let sql = "select P1, xP3y from t where a = ? and b = ? and c = ?";
        create_parameter_mapping(sql, &mut params, &ServerProfile::default()).unwrap();
        let names: Vec<_> = params.iter().map(|p| p.formal_name.clone().unwrap()).collect();
        assert_eq!(names, vec!["P2", "P4", "P5"]);
    }

    #[test]
    fn test_fixed_types() {
        let cases = [
            (SqlType::Integer, "integer"),
            (SqlType::Float, "real"),
            (SqlType::Real, "real"),
            (SqlType::Double, "float"),
            (SqlType::Timestamp, "datetime"),
            (SqlType::Date, "datetime"),
            (SqlType::Time, "datetime"),
            (SqlType::Varbinary, "image"),
            (SqlType::LongVarbinary, "image"),
            (SqlType::Bit, "bit"),
            (SqlType::BigInt, "decimal(38,10)"),
            (SqlType::Decimal, "decimal(38,10)"),
            (SqlType::Numeric, "decimal(38,10)"),
            (SqlType::SmallInt, "smallint"),
            (SqlType::TinyInt, "tinyint"),
        ];
        for (sql_type, expected) in cases {
            let param = map_one(ParameterListItem::new(sql_type), &ServerProfile::default());
            assert_eq!(param.formal_type.as_deref(), Some(expected), "{}", sql_type);
            assert_eq!(param.max_length, None);
        }
    }

    #[test]
    fn test_unsupported_types() {
        for sql_type in [SqlType::Binary, SqlType::Null, SqlType::Other] {
            let mut params = [ParameterListItem::bound(SqlType::Integer, 1), ParameterListItem::new(sql_type)];
            let err = create_parameter_mapping("?, ?", &mut params, &ServerProfile::default()).unwrap_err();
            assert_eq!(err, ParamError::NotImplemented { index: 2, sql_type });
        }
    }

    #[test]
    fn test_tds70_character_types() {
        let uni = profile(TdsVersion::Tds70, true, CharsetKind::SingleByte);
        let p = map_one(text_param(4000), &uni);
        assert_eq!(p.formal_type.as_deref(), Some("nvarchar(4000)"));
        assert_eq!(p.max_length, Some(MaxLength::Bounded(4000)));

        let p = map_one(ParameterListItem::new(SqlType::Char), &uni);
        assert_eq!(p.formal_type.as_deref(), Some("nvarchar(4000)"));

        let p = map_one(text_param(4001), &uni);
        assert_eq!(p.formal_type.as_deref(), Some("varchar(8000)"));
        assert_eq!(p.max_length, Some(MaxLength::Bounded(8000)));

        let p = map_one(text_param(8001), &uni);
        assert_eq!(p.formal_type.as_deref(), Some("ntext"));
        assert_eq!(p.max_length, Some(MaxLength::Unbounded));

        let ansi = profile(TdsVersion::Tds70, false, CharsetKind::SingleByte);
        let p = map_one(text_param(10), &ansi);
        assert_eq!(p.formal_type.as_deref(), Some("varchar(8000)"));

        let p = map_one(ParameterListItem::bound(SqlType::Varchar, "東京"), &ansi);
        assert_eq!(p.formal_type.as_deref(), Some("ntext"));

        let p = map_one(ParameterListItem::new(SqlType::Varchar), &ansi);
        assert_eq!(p.formal_type.as_deref(), Some("varchar(8000)"));

        let dbcs = profile(TdsVersion::Tds70, false, CharsetKind::DoubleByte);
        let p = map_one(text_param(10), &dbcs);
        assert_eq!(p.formal_type.as_deref(), Some("ntext"));
    }

    #[test]
    fn test_legacy_character_types() {
        let legacy = profile(TdsVersion::Tds50, true, CharsetKind::SingleByte);
        let p = map_one(text_param(255), &legacy);
        assert_eq!(p.formal_type.as_deref(), Some("varchar(255)"));
        assert_eq!(p.max_length, Some(MaxLength::Bounded(255)));

        let p = map_one(text_param(256), &legacy);
        assert_eq!(p.formal_type.as_deref(), Some("text"));
        assert_eq!(p.max_length, Some(MaxLength::Unbounded));

        let p = map_one(ParameterListItem::new(SqlType::Varchar), &legacy);
        assert_eq!(p.formal_type.as_deref(), Some("varchar(255)"));

        // 150 characters, 300 bytes once encoded
        let dbcs = profile(TdsVersion::Tds42, false, CharsetKind::DoubleByte);
        let p = map_one(ParameterListItem::bound(SqlType::Varchar, "東".repeat(150)), &dbcs);
        assert_eq!(p.formal_type.as_deref(), Some("text"));

        // Byte length is only consulted between 128 and 255 characters
        let p = map_one(ParameterListItem::bound(SqlType::Varchar, "東".repeat(100)), &dbcs);
        assert_eq!(p.formal_type.as_deref(), Some("varchar(255)"));
    }

    #[test]
    fn test_unicode_follows_profile() {
        let legacy = profile(TdsVersion::Tds42, true, CharsetKind::SingleByte);
        assert!(!legacy.use_unicode());
        let p = map_one(text_param(10), &legacy);
        assert_eq!(p.formal_type.as_deref(), Some("varchar(255)"));

        let mut params = [text_param(10)];
        map_parameters("select ?", &mut params, TdsVersion::Tds42, true, &CharsetKind::SingleByte)
            .unwrap();
        assert_eq!(params[0].formal_type.as_deref(), Some("varchar(255)"));

        let ansi = profile(TdsVersion::Tds70, false, CharsetKind::SingleByte);
        assert!(!ansi.use_unicode());
        let p = map_one(text_param(10), &ansi);
        assert_eq!(p.formal_type.as_deref(), Some("varchar(8000)"));

        let uni = profile(TdsVersion::Tds70, true, CharsetKind::SingleByte);
        assert!(uni.use_unicode());
        let p = map_one(text_param(10), &uni);
        assert_eq!(p.formal_type.as_deref(), Some("nvarchar(4000)"));
    }

    #[test]
    fn test_long_varchar() {
        let p = map_one(ParameterListItem::new(SqlType::LongVarchar), &ServerProfile::default());
        assert_eq!(p.formal_type.as_deref(), Some("ntext"));
        assert_eq!(p.max_length, Some(MaxLength::Unbounded));

        let legacy = profile(TdsVersion::Tds42, true, CharsetKind::SingleByte);
        let p = map_one(ParameterListItem::new(SqlType::LongVarchar), &legacy);
        assert_eq!(p.formal_type.as_deref(), Some("text"));
    }

    #[test]
    fn test_character_value_must_be_text() {
        let mut params = [ParameterListItem::bound(SqlType::Varchar, 5)];
        let err = create_parameter_mapping("?", &mut params, &ServerProfile::default()).unwrap_err();
        assert_eq!(err, ParamError::ValueType { index: 1, expected: "Text", found: "Integer" });
    }

    #[test]
    fn test_declarations() {
        let mut params = vec![
            ParameterListItem::bound(SqlType::Integer, 1),
            ParameterListItem::bound(SqlType::Timestamp, Temporal::parse("2024-01-01 10:00").unwrap()),
            ParameterListItem::output(SqlType::Timestamp),
        ];
        assert_eq!(declarations(&params), Err(ParamError::Unmapped { index: 1 }));

        create_parameter_mapping("exec proc ?, ?, ?", &mut params, &ServerProfile::default()).unwrap();
        assert_eq!(
            declarations(&params).unwrap(),
            "@P1 integer, @P2 datetime, @P3 datetime output"
        );
        assert_eq!(declarations(&[]).unwrap(), "");
    }
}
