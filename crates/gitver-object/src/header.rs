use crate::{ObjectError, ObjectType};

/// Parse a loose-object-style header: `"<type> <decimal-length>\0"`.
///
/// Returns `(type, declared_content_len, header_byte_len)`.
pub fn parse_header(data: &[u8]) -> Result<(ObjectType, usize, usize), ObjectError> {
    let nul = data
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| ObjectError::InvalidHeader("missing NUL terminator".into()))?;
    let header = &data[..nul];
    let space = header
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| ObjectError::InvalidHeader("missing space separator".into()))?;
    let obj_type = ObjectType::from_bytes(&header[..space])?;
    let len_str = std::str::from_utf8(&header[space + 1..])
        .map_err(|_| ObjectError::InvalidHeader("non-utf8 length field".into()))?;
    let len: usize = len_str
        .parse()
        .map_err(|_| ObjectError::InvalidHeader(format!("non-numeric length '{len_str}'")))?;
    Ok((obj_type, len, nul + 1))
}
