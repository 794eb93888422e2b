//! Rule expression parser.
//!
//! Recursive descent over a small prefix grammar, binding every operand to
//! indicators on one series as it parses:
//!
//! ```text
//! rule    := CROSS_ABOVE(op, op) | CROSS_BELOW(op, op) | ABOVE(op, op)
//!          | BELOW(op, op) | BETWEEN(op, op, op)
//!          | AND(rule, rule, ...) | OR(rule, rule, ...) | NOT(rule)
//!          | CONSECUTIVE(rule, n) | ANY_OF(rule, n)
//!          | STOP_LOSS(pct) | STOP_GAIN(pct) | WAIT_FOR(BUY|SELL, n)
//! op      := number | open | high | low | close | volume | typical
//!          | SMA(n[, op]) | EMA(n[, op]) | HIGHEST(n[, op]) | LOWEST(n[, op])
//!          | PREVIOUS(n[, op]) | WILLIAMS_R(n)
//! ```
//!
//! Keywords are case-sensitive. Indicators default to `close` as input.
//! Identical sub-expressions share one cached indicator.

use crate::domain::error::{ParseError, TradebenchError};
use crate::domain::indicator::price::{price, PriceField};
use crate::domain::indicator::{
    close_price, constant, ema, highest, lowest, previous, sma, williams_r, IndicatorRef,
};
use crate::domain::num::Num;
use crate::domain::order::OrderType;
use crate::domain::rule::Rule;
use crate::domain::series::BarSeries;
use std::collections::HashMap;

/// A parsed rule and the warm-up length of the indicators it reads.
#[derive(Debug, Clone)]
pub struct ParsedRule<N: Num> {
    pub rule: Rule<N>,
    pub unstable_bars: usize,
}

struct Parser<'a, N: Num> {
    input: &'a str,
    pos: usize,
    series: &'a BarSeries<N>,
    indicators: HashMap<String, IndicatorRef<N>>,
    unstable_bars: usize,
}

impl<'a, N: Num> Parser<'a, N> {
    fn new(input: &'a str, series: &'a BarSeries<N>) -> Self {
        Parser {
            input,
            pos: 0,
            series,
            indicators: HashMap::new(),
            unstable_bars: 0,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>, position: usize) -> ParseError {
        ParseError {
            message: message.into(),
            position,
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{}', found '{}'", expected, ch), self.pos)),
            None => Err(self.error(format!("expected '{}', found end of input", expected), self.pos)),
        }
    }

    /// Consumes `ch` if it is the next non-blank character.
    fn consume_char(&mut self, ch: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let remaining = self.remaining();
        remaining.starts_with(keyword)
            && !remaining[keyword.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn peek_word(&self) -> String {
        let word: String = self
            .remaining()
            .chars()
            .take_while(|ch| ch.is_alphanumeric() || *ch == '_')
            .collect();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }
        if digits == 0 {
            return Err(self.error("expected number", start));
        }

        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map_err(|_| self.error(format!("invalid number: {}", text), start))
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.advance();
        }
        if self.pos == start {
            return Err(self.error("expected integer", start));
        }

        let text = &self.input[start..self.pos];
        text.parse::<usize>()
            .map_err(|_| self.error(format!("invalid integer: {}", text), start))
    }

    fn parse_positive(&mut self, what: &str) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let value = self.parse_integer()?;
        if value == 0 {
            return Err(self.error(format!("{} must be at least 1", what), start));
        }
        Ok(value)
    }

    /// Returns the cached handle for an identical expression, registering
    /// `indicator` otherwise.
    fn intern(&mut self, indicator: IndicatorRef<N>) -> IndicatorRef<N> {
        self.unstable_bars = self.unstable_bars.max(indicator.unstable_bars());
        self.indicators
            .entry(indicator.name())
            .or_insert(indicator)
            .clone()
    }

    fn parse_price_field(&mut self) -> Result<Option<IndicatorRef<N>>, ParseError> {
        let field = match self.peek_word().as_str() {
            "open" => PriceField::Open,
            "high" => PriceField::High,
            "low" => PriceField::Low,
            "close" => PriceField::Close,
            "volume" => PriceField::Volume,
            "typical" => PriceField::Typical,
            _ => return Ok(None),
        };
        self.pos += self.peek_word().len();
        let indicator = price(self.series, field);
        Ok(Some(self.intern(indicator)))
    }

    /// `NAME(period[, input])` with `close` as the default input.
    fn parse_windowed(
        &mut self,
        keyword: &str,
        build: fn(&IndicatorRef<N>, usize) -> Result<IndicatorRef<N>, TradebenchError>,
    ) -> Result<IndicatorRef<N>, ParseError> {
        let start = self.pos;
        self.consume_keyword(keyword);
        self.expect_char('(')?;
        let period = self.parse_positive("period")?;
        let input = if self.consume_char(',') {
            self.parse_operand()?
        } else {
            let close = close_price(self.series);
            self.intern(close)
        };
        self.expect_char(')')?;
        let indicator = build(&input, period).map_err(|e| self.error(e.to_string(), start))?;
        Ok(self.intern(indicator))
    }

    fn parse_indicator(&mut self) -> Result<IndicatorRef<N>, ParseError> {
        if self.peek_keyword("SMA") {
            return self.parse_windowed("SMA", sma);
        }
        if self.peek_keyword("EMA") {
            return self.parse_windowed("EMA", ema);
        }
        if self.peek_keyword("HIGHEST") {
            return self.parse_windowed("HIGHEST", highest);
        }
        if self.peek_keyword("LOWEST") {
            return self.parse_windowed("LOWEST", lowest);
        }
        if self.peek_keyword("PREVIOUS") {
            return self.parse_windowed("PREVIOUS", |input, bars| Ok(previous(input, bars)));
        }
        if self.peek_keyword("WILLIAMS_R") {
            let start = self.pos;
            self.consume_keyword("WILLIAMS_R");
            self.expect_char('(')?;
            let period = self.parse_positive("period")?;
            self.expect_char(')')?;
            let indicator =
                williams_r(self.series, period).map_err(|e| self.error(e.to_string(), start))?;
            return Ok(self.intern(indicator));
        }

        let word = self.peek_word();
        Err(self.error(format!("expected indicator, found '{}'", word), self.pos))
    }

    fn parse_operand(&mut self) -> Result<IndicatorRef<N>, ParseError> {
        self.skip_whitespace();

        if self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || ch == '-' || ch == '.')
        {
            let value = self.parse_number()?;
            let indicator = constant(self.series, N::num_of(value));
            return Ok(self.intern(indicator));
        }
        if let Some(field) = self.parse_price_field()? {
            return Ok(field);
        }
        self.parse_indicator()
    }

    fn parse_comparison(&mut self, keyword: &str) -> Result<Rule<N>, ParseError> {
        self.consume_keyword(keyword);
        self.expect_char('(')?;
        let left = self.parse_operand()?;
        self.expect_char(',')?;
        let right = self.parse_operand()?;
        self.expect_char(')')?;

        Ok(match keyword {
            "CROSS_ABOVE" => Rule::crossed_up(&left, &right),
            "CROSS_BELOW" => Rule::crossed_down(&left, &right),
            "ABOVE" => Rule::over(&left, &right),
            _ => Rule::under(&left, &right),
        })
    }

    fn parse_between(&mut self) -> Result<Rule<N>, ParseError> {
        self.consume_keyword("BETWEEN");
        self.expect_char('(')?;
        let operand = self.parse_operand()?;
        self.expect_char(',')?;
        let lower = self.parse_operand()?;
        self.expect_char(',')?;
        let upper = self.parse_operand()?;
        self.expect_char(')')?;
        Ok(Rule::in_range(&operand, &lower, &upper))
    }

    /// `AND(...)` / `OR(...)` with at least two children.
    fn parse_list(&mut self, keyword: &str) -> Result<Vec<Rule<N>>, ParseError> {
        self.consume_keyword(keyword);
        self.expect_char('(')?;

        let mut rules = vec![self.parse_rule()?];
        while !self.consume_char(')') {
            self.expect_char(',')?;
            rules.push(self.parse_rule()?);
        }
        if rules.len() < 2 {
            return Err(self.error(format!("{} requires at least 2 rules", keyword), self.pos));
        }
        Ok(rules)
    }

    fn parse_counted(&mut self, keyword: &str) -> Result<(Rule<N>, usize), ParseError> {
        self.consume_keyword(keyword);
        self.expect_char('(')?;
        let rule = self.parse_rule()?;
        self.expect_char(',')?;
        let count = self.parse_positive("count")?;
        self.expect_char(')')?;
        Ok((rule, count))
    }

    fn parse_stop(&mut self, keyword: &str) -> Result<Rule<N>, ParseError> {
        self.consume_keyword(keyword);
        self.expect_char('(')?;
        self.skip_whitespace();
        let start = self.pos;
        let pct = self.parse_number()?;
        if pct <= 0.0 {
            return Err(self.error("percentage must be positive", start));
        }
        self.expect_char(')')?;
        let close = close_price(self.series);
        let close = self.intern(close);
        Ok(if keyword == "STOP_LOSS" {
            Rule::stop_loss(&close, pct)
        } else {
            Rule::stop_gain(&close, pct)
        })
    }

    fn parse_wait_for(&mut self) -> Result<Rule<N>, ParseError> {
        self.consume_keyword("WAIT_FOR");
        self.expect_char('(')?;
        self.skip_whitespace();
        let order_type = if self.consume_keyword("BUY") {
            OrderType::Buy
        } else if self.consume_keyword("SELL") {
            OrderType::Sell
        } else {
            let word = self.peek_word();
            return Err(self.error(format!("expected BUY or SELL, found '{}'", word), self.pos));
        };
        self.expect_char(',')?;
        let bars = self.parse_integer()?;
        self.expect_char(')')?;
        Ok(Rule::wait_for(order_type, bars))
    }

    fn parse_rule(&mut self) -> Result<Rule<N>, ParseError> {
        self.skip_whitespace();

        for keyword in ["CROSS_ABOVE", "CROSS_BELOW", "ABOVE", "BELOW"] {
            if self.peek_keyword(keyword) {
                return self.parse_comparison(keyword);
            }
        }
        if self.peek_keyword("BETWEEN") {
            return self.parse_between();
        }
        if self.peek_keyword("AND") {
            return Ok(Rule::And(self.parse_list("AND")?));
        }
        if self.peek_keyword("OR") {
            return Ok(Rule::Or(self.parse_list("OR")?));
        }
        if self.consume_keyword("NOT") {
            self.expect_char('(')?;
            let rule = self.parse_rule()?;
            self.expect_char(')')?;
            return Ok(Rule::Not(Box::new(rule)));
        }
        if self.peek_keyword("CONSECUTIVE") {
            let (rule, count) = self.parse_counted("CONSECUTIVE")?;
            return Ok(rule.consecutive(count));
        }
        if self.peek_keyword("ANY_OF") {
            let (rule, count) = self.parse_counted("ANY_OF")?;
            return Ok(rule.any_of(count));
        }
        for keyword in ["STOP_LOSS", "STOP_GAIN"] {
            if self.peek_keyword(keyword) {
                return self.parse_stop(keyword);
            }
        }
        if self.peek_keyword("WAIT_FOR") {
            return self.parse_wait_for();
        }

        let word = self.peek_word();
        Err(self.error(format!("expected rule, found '{}'", word), self.pos))
    }

    fn parse(mut self) -> Result<ParsedRule<N>, ParseError> {
        let rule = self.parse_rule()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(
                format!("unexpected input after rule: '{}'", self.remaining()),
                self.pos,
            ));
        }
        Ok(ParsedRule {
            rule,
            unstable_bars: self.unstable_bars,
        })
    }
}

/// Parses `input` into a rule over indicators of `series`.
pub fn parse<N: Num>(input: &str, series: &BarSeries<N>) -> Result<ParsedRule<N>, ParseError> {
    Parser::new(input, series).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::series_of_closes;
    use crate::domain::trading_record::TradingRecord;

    fn series() -> BarSeries<f64> {
        series_of_closes(&[1.0, 2.0, 3.0, 4.0, 3.0, 2.0, 1.0])
    }

    fn parse_ok(input: &str) -> ParsedRule<f64> {
        parse(input, &series()).unwrap()
    }

    fn parse_err(input: &str) -> ParseError {
        parse(input, &series()).unwrap_err()
    }

    #[test]
    fn parse_above() {
        let parsed = parse_ok("ABOVE(close, 100)");
        assert_eq!(parsed.rule.to_string(), "Over(CLOSE, 100)");
        assert_eq!(parsed.unstable_bars, 0);
    }

    #[test]
    fn parse_cross_with_default_input() {
        let parsed = parse_ok("CROSS_ABOVE(SMA(2), SMA(3))");
        assert!(matches!(parsed.rule, Rule::CrossedUp { .. }));
        assert_eq!(parsed.rule.to_string(), "CrossedUp(SMA(2, CLOSE), SMA(3, CLOSE))");
        assert_eq!(parsed.unstable_bars, 2);
    }

    #[test]
    fn parse_nested_indicator_input() {
        let parsed = parse_ok("BELOW(EMA(3, HIGHEST(2, high)), 10)");
        assert!(matches!(parsed.rule, Rule::Under { .. }));
        assert!(parsed.rule.to_string().contains("HIGHEST(2, HIGH)"));
    }

    #[test]
    fn parse_between_bounds() {
        let parsed = parse_ok("BETWEEN(close, 2, 3.5)");
        let record = TradingRecord::new(OrderType::Buy);
        assert!(!parsed.rule.is_satisfied(0, &record));
        assert!(parsed.rule.is_satisfied(1, &record));
        assert!(parsed.rule.is_satisfied(2, &record));
        assert!(!parsed.rule.is_satisfied(3, &record));
    }

    #[test]
    fn parse_variadic_and_or() {
        match parse_ok("AND(ABOVE(close, 1), BELOW(close, 5), ABOVE(volume, 0))").rule {
            Rule::And(rules) => assert_eq!(rules.len(), 3),
            other => panic!("expected And, got {}", other),
        }
        match parse_ok("OR(ABOVE(close, 1), BELOW(close, 5))").rule {
            Rule::Or(rules) => assert_eq!(rules.len(), 2),
            other => panic!("expected Or, got {}", other),
        }
    }

    #[test]
    fn parse_temporal_rules() {
        match parse_ok("CONSECUTIVE(ABOVE(close, 1), 3)").rule {
            Rule::Consecutive { count, .. } => assert_eq!(count, 3),
            other => panic!("expected Consecutive, got {}", other),
        }
        match parse_ok("ANY_OF(ABOVE(close, 1), 5)").rule {
            Rule::AnyOf { count, .. } => assert_eq!(count, 5),
            other => panic!("expected AnyOf, got {}", other),
        }
    }

    #[test]
    fn parse_position_rules() {
        assert!(matches!(parse_ok("STOP_LOSS(5)").rule, Rule::StopLoss { .. }));
        assert!(matches!(parse_ok("STOP_GAIN(2.5)").rule, Rule::StopGain { .. }));
        assert!(matches!(
            parse_ok("WAIT_FOR(SELL, 3)").rule,
            Rule::WaitFor {
                order_type: OrderType::Sell,
                bars: 3
            }
        ));
        assert!(matches!(parse_ok("NOT(STOP_LOSS(5))").rule, Rule::Not(_)));
    }

    #[test]
    fn parse_williams_r_and_previous() {
        let parsed = parse_ok("CROSS_ABOVE(WILLIAMS_R(3), -80)");
        assert_eq!(parsed.unstable_bars, 2);
        let parsed = parse_ok("ABOVE(close, PREVIOUS(1))");
        let record = TradingRecord::new(OrderType::Buy);
        assert!(parsed.rule.is_satisfied(1, &record));
        assert!(!parsed.rule.is_satisfied(4, &record));
    }

    #[test]
    fn identical_expressions_share_one_indicator() {
        match parse_ok("AND(ABOVE(SMA(2), 1), BELOW(SMA(2), 5))").rule {
            Rule::And(rules) => match (&rules[0], &rules[1]) {
                (Rule::Over { left, .. }, Rule::Under { left: other, .. }) => {
                    assert!(std::rc::Rc::ptr_eq(left, other));
                }
                _ => panic!("unexpected children"),
            },
            other => panic!("expected And, got {}", other),
        }
    }

    #[test]
    fn parse_whitespace_handling() {
        let parsed = parse_ok("  ABOVE (  close ,  SMA( 2 )  )  ");
        assert!(matches!(parsed.rule, Rule::Over { .. }));
    }

    #[test]
    fn parse_negative_and_float_numbers() {
        assert_eq!(parse_ok("ABOVE(close, -100.5)").rule.to_string(), "Over(CLOSE, -100.5)");
    }

    #[test]
    fn error_unexpected_token() {
        let err = parse_err("ABOVE(close, FOO)");
        assert!(err.message.contains("expected indicator"));
        assert_eq!(err.position, 13);
    }

    #[test]
    fn error_missing_paren() {
        let err = parse_err("ABOVE(close, 1");
        assert!(err.message.contains("expected ')'"));
    }

    #[test]
    fn error_missing_comma() {
        let err = parse_err("ABOVE(close 1)");
        assert!(err.message.contains("expected ','"));
    }

    #[test]
    fn error_invalid_rule_and_case() {
        assert!(parse_err("FOO(close, 1)").message.contains("expected rule"));
        assert!(parse_err("above(close, 1)").message.contains("expected rule"));
        assert!(parse_err("").message.contains("end of input"));
    }

    #[test]
    fn error_trailing_input() {
        let err = parse_err("ABOVE(close, 1) extra");
        assert!(err.message.contains("unexpected input"));
    }

    #[test]
    fn error_single_child_list() {
        assert!(parse_err("AND(ABOVE(close, 1))")
            .message
            .contains("AND requires at least 2 rules"));
        assert!(parse_err("OR(ABOVE(close, 1))")
            .message
            .contains("OR requires at least 2 rules"));
    }

    #[test]
    fn error_zero_period() {
        let err = parse_err("ABOVE(SMA(0), 1)");
        assert!(err.message.contains("period must be at least 1"));
        assert_eq!(err.position, 10);
    }

    #[test]
    fn error_non_positive_stop() {
        assert!(parse_err("STOP_LOSS(0)").message.contains("positive"));
    }
}
