//! Arithmetic for `$Calc`: `+ - * / %`, unary minus and parentheses over
//! floating point numbers.

/// Evaluate an expression and format the result.
///
/// Integral results are printed without a fractional part.
pub fn evaluate(expression: &str) -> Result<String, String> {
    let mut parser = Calc {
        chars: expression.chars().collect(),
        pos: 0,
    };
    if parser.peek().is_none() {
        return Err("the expression is empty".to_string());
    }

    let value = parser.expression()?;
    if parser.peek().is_some() {
        return Err(format!(
            "unexpected '{}' in expression '{}'",
            parser.chars[parser.pos], expression
        ));
    }
    if !value.is_finite() {
        return Err(format!("expression '{}' does not produce a number", expression));
    }

    Ok(format_number(value))
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

struct Calc {
    chars: Vec<char>,
    pos: usize,
}

impl Calc {
    /// The next token character, skipping whitespace
    fn peek(&mut self) -> Option<char> {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
        self.chars.get(self.pos).copied()
    }

    fn expression(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.unary()?;
        while let Some(op @ ('*' | '/' | '%')) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err("division by zero".to_string()),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some('+') => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let value = self.expression()?;
                if self.peek() != Some(')') {
                    return Err("missing ')' in expression".to_string());
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let start = self.pos;
                while self
                    .chars
                    .get(self.pos)
                    .is_some_and(|c| c.is_ascii_digit() || *c == '.')
                {
                    self.pos += 1;
                }
                let literal: String = self.chars[start..self.pos].iter().collect();
                literal
                    .parse()
                    .map_err(|_| format!("'{}' is not a number", literal))
            }
            Some(c) => Err(format!("unexpected '{}' in expression", c)),
            None => Err("the expression ends unexpectedly".to_string()),
        }
    }
}
