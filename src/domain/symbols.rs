//! Instrument list parsing.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SymbolError {
    #[error("empty symbol in list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    Duplicate(String),
}

/// Normalise an instrument name: trimmed and lowercased.
pub fn normalize(symbol: &str) -> String {
    symbol.trim().to_lowercase()
}

/// Split a comma-separated symbol list, rejecting blanks and repeats.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, SymbolError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let symbol = normalize(token);
        if symbol.is_empty() {
            return Err(SymbolError::EmptyToken);
        }
        if !seen.insert(symbol.clone()) {
            return Err(SymbolError::Duplicate(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_in_order() {
        assert_eq!(
            parse_symbols("msft,rvnl.ns,mahabank.ns").unwrap(),
            vec!["msft", "rvnl.ns", "mahabank.ns"]
        );
    }

    #[test]
    fn trims_and_lowercases() {
        assert_eq!(parse_symbols("  MSFT , Msumi.NS ").unwrap(), vec!["msft", "msumi.ns"]);
    }

    #[test]
    fn rejects_empty_token() {
        assert_eq!(parse_symbols("msft,,aapl"), Err(SymbolError::EmptyToken));
        assert_eq!(parse_symbols(""), Err(SymbolError::EmptyToken));
    }

    #[test]
    fn rejects_duplicates_case_insensitively() {
        assert_eq!(
            parse_symbols("msft,aapl,MSFT"),
            Err(SymbolError::Duplicate("msft".into()))
        );
    }
}
