use hex::FromHexError;

/// Upper-case bytes separated by spaces, e.g. `5A 5A 22 06 EE 00`.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex text. Whitespace, `:` and `,` between digit pairs are ignored.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let digits: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != ',')
        .collect();
    hex::decode(&digits).map_err(|err| match err {
        FromHexError::OddLength => format!("odd number of hex digits ({})", digits.len()),
        FromHexError::InvalidHexCharacter { c, index } => {
            format!("invalid hex digit `{c}` at digit {index}")
        }
        other => other.to_string(),
    })
}
