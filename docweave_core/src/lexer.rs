use logos::Logos;
use snailquote::unescape;

use crate::WeaveError;
use crate::WeaveResult;
use crate::tokens::Token;
use crate::tokens::TokenGroup;

/// Opening delimiter of every directive line.
pub const DIRECTIVE_OPEN: &str = "<!---";
/// Closing delimiter of every directive line.
pub const DIRECTIVE_CLOSE: &str = "-->";

/// Raw tokens produced by logos for the inside of a directive.
#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
	#[token("=")]
	Equals,
	#[regex(r#""([^"\\]|\\.)*""#)]
	DoubleQuotedString,
	#[regex(r"'([^'\\]|\\.)*'")]
	SingleQuotedString,
	#[regex(r#"[^ \t\r\n="']+"#)]
	Word,
}

/// Returns true when the trimmed line is a directive candidate: it starts
/// with `<!---` followed by whitespace. Such lines must parse as a valid
/// directive or they are reported as malformed.
pub fn is_directive_line(trimmed: &str) -> bool {
	trimmed
		.strip_prefix(DIRECTIVE_OPEN)
		.and_then(|rest| rest.chars().next())
		.is_some_and(char::is_whitespace)
}

/// Tokenize a single trimmed directive line.
pub fn tokenize(trimmed: &str, line: usize, file: &str) -> WeaveResult<TokenGroup> {
	let malformed = |reason: &str| {
		WeaveError::MalformedDirective {
			file: file.to_string(),
			line,
			reason: reason.to_string(),
		}
	};

	let Some(rest) = trimmed.strip_prefix(DIRECTIVE_OPEN) else {
		return Err(malformed("expected `<!---`"));
	};
	let Some(inner) = rest.strip_suffix(DIRECTIVE_CLOSE) else {
		return Err(malformed("expected the line to end with `-->`"));
	};

	let mut tokens = Vec::new();
	let mut lexer = RawToken::lexer(inner);

	while let Some(result) = lexer.next() {
		let slice = lexer.slice();
		let Ok(raw) = result else {
			return Err(malformed(&format!("unexpected `{slice}`")));
		};

		let token = match raw {
			RawToken::Equals => Token::Equals,
			RawToken::Word => Token::Word(slice.to_string()),
			RawToken::DoubleQuotedString | RawToken::SingleQuotedString => {
				Token::String(unquote(slice).ok_or_else(|| malformed("invalid escape"))?)
			}
		};
		tokens.push(token);
	}

	if tokens.is_empty() {
		return Err(malformed("missing keyword"));
	}

	Ok(TokenGroup { tokens, line })
}

/// Strip surrounding quotes and unescape if needed.
fn unquote(slice: &str) -> Option<String> {
	let inner = &slice[1..slice.len() - 1];
	if inner.contains('\\') {
		unescape(inner).ok()
	} else {
		Some(inner.to_string())
	}
}
