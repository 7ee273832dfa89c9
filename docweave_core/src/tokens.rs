/// Tokens found between the `<!---` and `-->` delimiters of a directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
	/// A bare word, e.g. `INCLUDE`, `dedent` or `src/lib.rs#BASIC`.
	Word(String),
	/// `=`
	Equals,
	/// An unescaped quoted value, e.g. `// hide` from `"// hide"`.
	String(String),
}

impl Token {
	/// The textual value of a word or string token.
	pub fn value(&self) -> Option<&str> {
		match self {
			Token::Word(value) | Token::String(value) => Some(value),
			Token::Equals => None,
		}
	}
}

/// The tokens of a single directive line together with its 1-indexed line
/// number in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGroup {
	/// The sequence of tokens parsed from the directive.
	pub tokens: Vec<Token>,
	/// 1-indexed line of the directive in the document.
	pub line: usize,
}

impl TokenGroup {
	/// The leading keyword, e.g. `INCLUDE` or `END`.
	pub fn keyword(&self) -> Option<&str> {
		match self.tokens.first() {
			Some(Token::Word(word)) => Some(word),
			_ => None,
		}
	}

	/// Everything after the keyword.
	pub fn arguments(&self) -> &[Token] {
		self.tokens.get(1..).unwrap_or_default()
	}
}
