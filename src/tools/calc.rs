//! 算术计算工具（参考实现）
//!
//! 对应 Calculate / Operate 动作的最小执行器：清洗千分位逗号与货币符号后
//! 求值四则运算表达式（+ - * / 与括号、一元负号）。生产部署可替换为
//! 代码生成型执行器。

use async_trait::async_trait;

use crate::table::TableSnapshot;
use crate::tools::{ToolAttemptResult, ToolExecutor};

#[derive(Debug, Default)]
pub struct CalculatorTool;

impl CalculatorTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolExecutor for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    async fn execute(&self, argument: &str, _snapshot: &TableSnapshot) -> ToolAttemptResult {
        let cleaned = clean_expression(argument);
        match evaluate(&cleaned) {
            Ok(value) => ToolAttemptResult::ok(format_number(value)),
            Err(e) => ToolAttemptResult::failure(e),
        }
    }
}

/// 去掉千分位逗号与货币符号
fn clean_expression(expr: &str) -> String {
    expr.replace(',', "").replace('$', "")
}

/// 整数值不带小数点输出
fn format_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 && value.abs() < 1e15 {
        format!("{}", value.round() as i64)
    } else {
        format!("{value}")
    }
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.chars.peek().copied()
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some('+') => {
                    self.chars.next();
                    value += self.term()?;
                }
                Some('-') => {
                    self.chars.next();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        loop {
            match self.peek() {
                Some('*') => {
                    self.chars.next();
                    value *= self.factor()?;
                }
                Some('/') => {
                    self.chars.next();
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some('-') => {
                self.chars.next();
                Ok(-self.factor()?)
            }
            Some('(') => {
                self.chars.next();
                let value = self.expr()?;
                if self.peek() != Some(')') {
                    return Err("unbalanced parenthesis".to_string());
                }
                self.chars.next();
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(format!("unexpected character: {c}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        let mut buf = String::new();
        while matches!(self.chars.peek(), Some(c) if c.is_ascii_digit() || *c == '.') {
            buf.push(self.chars.next().unwrap());
        }
        buf.parse::<f64>()
            .map_err(|_| format!("invalid number: {buf}"))
    }
}

fn evaluate(expr: &str) -> Result<f64, String> {
    let mut parser = Parser::new(expr);
    let value = parser.expr()?;
    if parser.peek().is_some() {
        return Err("trailing characters in expression".to_string());
    }
    Ok(value)
}
