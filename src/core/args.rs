/// One logical command-line argument: a bare flag, a flag with its values, or a
/// positional value. Tokens are compared by their first element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(Vec<String>);

impl Token {
    pub fn flag(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

/// Ordered list of command-line tokens belonging to one option group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentList {
    tokens: Vec<Token>,
}

impl ArgumentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one logical argument. Multi-part calls are never split.
    pub fn add<I, S>(&mut self, parts: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        if !parts.is_empty() {
            self.tokens.push(Token(parts));
        }
        self
    }

    pub fn add_flag(&mut self, flag: impl Into<String>) -> &mut Self {
        let flag: String = flag.into();
        self.add([flag])
    }

    pub fn add_pair(&mut self, flag: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let parts: [String; 2] = [flag.into(), value.into()];
        self.add(parts)
    }

    /// Single-string convenience form: `"-ss 10"` becomes a flag/value pair,
    /// anything else is kept as one token.
    pub fn add_option(&mut self, option: &str) -> &mut Self {
        let words: Vec<&str> = option.split_whitespace().collect();
        if words.len() == 2 {
            self.add_pair(words[0], words[1])
        } else {
            self.add([option])
        }
    }

    /// Values following the most recent occurrence of `flag`, or `None` when
    /// the flag is absent.
    pub fn find(&self, flag: &str, arity: usize) -> Option<Vec<String>> {
        let index = self
            .tokens
            .iter()
            .rposition(|token| token.flag() == Some(flag))?;
        let values = self.tokens[index..]
            .iter()
            .flat_map(|token| token.0.iter())
            .skip(1)
            .take(arity)
            .cloned()
            .collect();
        Some(values)
    }

    /// Deletes the first occurrence of `flag` plus its `arity` following values.
    /// Returns false when the flag is absent.
    pub fn remove(&mut self, flag: &str, arity: usize) -> bool {
        let Some(index) = self
            .tokens
            .iter()
            .position(|token| token.flag() == Some(flag))
        else {
            return false;
        };

        let head = self.tokens.remove(index);
        let mut remaining = arity.saturating_sub(head.0.len() - 1);
        if head.0.len() - 1 > arity {
            let rest: Vec<String> = head.0.into_iter().skip(1 + arity).collect();
            self.tokens.insert(index, Token(rest));
            return true;
        }

        while remaining > 0 && index < self.tokens.len() {
            let next_len = self.tokens[index].0.len();
            if next_len <= remaining {
                self.tokens.remove(index);
                remaining -= next_len;
            } else {
                self.tokens[index].0.drain(..remaining);
                remaining = 0;
            }
        }
        true
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.tokens.iter().any(|token| token.flag() == Some(flag))
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Flattened token sequence in insertion order.
    pub fn get(&self) -> Vec<String> {
        self.tokens
            .iter()
            .flat_map(|token| token.0.iter().cloned())
            .collect()
    }

    pub(crate) fn extend_into(&self, argv: &mut Vec<String>) {
        argv.extend(self.tokens.iter().flat_map(|token| token.0.iter().cloned()));
    }
}
