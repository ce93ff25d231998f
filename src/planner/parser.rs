//! Recursive-descent parser for the SQL dialect, one routine per
//! statement kind.

use crate::planner::command::{Command, Operator, Projection, WhereClause};
use crate::planner::lexer::{tokenize, Token};
use crate::types::error::{DatabaseError, Result};
use crate::types::value::{ColumnDefinition, ColumnModifiers, ColumnType, LiteralValue};

fn parse_error(details: impl Into<String>) -> DatabaseError {
    DatabaseError::Parse {
        details: details.into(),
    }
}

/// Parse exactly one semicolon-terminated statement.
pub fn parse_command(input: &str) -> Result<Command> {
    let mut statements = parse_statements(input)?;
    match statements.len() {
        1 => Ok(statements.remove(0)),
        0 => Err(parse_error("empty statement")),
        _ => Err(parse_error("expected a single statement")),
    }
}

/// Parse a line of semicolon-terminated statements.
pub fn parse_statements(input: &str) -> Result<Vec<Command>> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut statements = Vec::new();
    while !parser.at_end() {
        statements.push(parser.parse_statement()?);
        parser.expect(&Token::Semicolon)?;
    }
    Ok(statements)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<&Token> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| parse_error("unexpected end of statement"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        let token = self.next()?;
        if token == expected {
            Ok(())
        } else {
            Err(parse_error(format!(
                "expected {:?}, found {:?}",
                expected, token
            )))
        }
    }

    /// Consume the next identifier if it equals `keyword` (case-insensitive).
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if let Some(Token::Identifier(word)) = self.peek() {
            if word.eq_ignore_ascii_case(keyword) {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(parse_error(format!(
                "expected {}, found {:?}",
                keyword.to_uppercase(),
                self.peek()
            )))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.next()? {
            Token::Identifier(word) => Ok(word.clone()),
            other => Err(parse_error(format!("expected identifier, found {:?}", other))),
        }
    }

    fn parse_statement(&mut self) -> Result<Command> {
        if self.eat_keyword("show") {
            self.expect_keyword("tables")?;
            return Ok(Command::ShowTables);
        }
        if self.eat_keyword("create") {
            if self.eat_keyword("table") {
                return self.parse_create_table();
            }
            let is_unique = self.eat_keyword("unique");
            self.expect_keyword("index")?;
            return self.parse_create_index(is_unique);
        }
        if self.eat_keyword("drop") {
            self.expect_keyword("table")?;
            let table_name = self.expect_identifier()?;
            return Ok(Command::DropTable { table_name });
        }
        if self.eat_keyword("insert") {
            self.expect_keyword("into")?;
            return self.parse_insert();
        }
        if self.eat_keyword("select") {
            return self.parse_select();
        }
        if self.eat_keyword("delete") {
            self.expect_keyword("from")?;
            let table_name = self.expect_identifier()?;
            let condition = self.parse_optional_where()?;
            return Ok(Command::Delete {
                table_name,
                condition,
            });
        }
        if self.eat_keyword("update") {
            return self.parse_update();
        }
        if self.eat_keyword("exit") {
            return Ok(Command::Exit);
        }
        Err(parse_error(format!(
            "unrecognized statement starting with {:?}",
            self.peek()
        )))
    }

    fn parse_create_table(&mut self) -> Result<Command> {
        let table_name = self.expect_identifier()?;
        self.expect(&Token::LeftParen)?;
        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_column_definition()?);
            if !self.eat_token(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RightParen)?;
        Ok(Command::CreateTable {
            table_name,
            columns,
        })
    }

    fn parse_column_definition(&mut self) -> Result<ColumnDefinition> {
        let name = self.expect_identifier()?;
        let type_word = self.expect_identifier()?;
        let column_type = ColumnType::from_keyword(&type_word)
            .ok_or_else(|| parse_error(format!("unknown column type: {}", type_word)))?;

        let mut modifiers = ColumnModifiers::default();
        loop {
            if self.eat_keyword("not") {
                self.expect_keyword("null")?;
                modifiers.not_null = true;
            } else if self.eat_keyword("null") {
                modifiers.is_null = true;
            } else if self.eat_keyword("primary") {
                self.expect_keyword("key")?;
                modifiers.primary_key = true;
            } else if self.eat_keyword("autoincrement") {
                modifiers.auto_increment = true;
            } else if self.eat_keyword("unique") {
                modifiers.unique = true;
            } else if self.eat_keyword("default") {
                modifiers.default_value = Some(self.parse_literal()?);
            } else {
                break;
            }
        }

        Ok(ColumnDefinition {
            name,
            column_type,
            modifiers,
        })
    }

    fn parse_create_index(&mut self, is_unique: bool) -> Result<Command> {
        self.expect_keyword("on")?;
        let table_name = self.expect_identifier()?;
        self.expect(&Token::LeftParen)?;
        let column_name = self.expect_identifier()?;
        self.expect(&Token::RightParen)?;
        Ok(Command::CreateIndex {
            is_unique,
            table_name,
            column_name,
        })
    }

    fn parse_insert(&mut self) -> Result<Command> {
        let table_name = self.expect_identifier()?;
        let mut column_names = Vec::new();
        if self.eat_token(&Token::LeftParen) {
            loop {
                column_names.push(self.expect_identifier()?);
                if !self.eat_token(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RightParen)?;
        }
        self.expect_keyword("values")?;
        self.expect(&Token::LeftParen)?;
        let mut values = Vec::new();
        loop {
            values.push(self.parse_literal()?);
            if !self.eat_token(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RightParen)?;
        Ok(Command::Insert {
            table_name,
            column_names,
            values,
        })
    }

    fn parse_select(&mut self) -> Result<Command> {
        let projection = if self.eat_token(&Token::Asterisk) {
            Projection::All
        } else {
            let mut names = vec![self.expect_identifier()?];
            while self.eat_token(&Token::Comma) {
                names.push(self.expect_identifier()?);
            }
            Projection::Columns(names)
        };
        self.expect_keyword("from")?;
        let table_name = self.expect_identifier()?;
        let condition = self.parse_optional_where()?;
        Ok(Command::Select {
            projection,
            table_name,
            condition,
        })
    }

    fn parse_update(&mut self) -> Result<Command> {
        let table_name = self.expect_identifier()?;
        self.expect_keyword("set")?;
        let column_name = self.expect_identifier()?;
        self.expect(&Token::Equal)?;
        let value = self.parse_literal()?;
        let condition = self.parse_optional_where()?;
        Ok(Command::Update {
            table_name,
            column_name,
            value,
            condition,
        })
    }

    fn parse_optional_where(&mut self) -> Result<Option<WhereClause>> {
        if !self.eat_keyword("where") {
            return Ok(None);
        }
        let column_name = self.expect_identifier()?;
        let op = self.parse_operator()?;
        let literal = self.parse_literal()?;
        Ok(Some(WhereClause {
            column_name,
            op,
            literal,
        }))
    }

    fn parse_operator(&mut self) -> Result<Operator> {
        match self.next()? {
            Token::Less => Ok(Operator::Less),
            Token::LessEqual => Ok(Operator::LessEqual),
            Token::Equal => Ok(Operator::Equal),
            Token::GreaterEqual => Ok(Operator::GreaterEqual),
            Token::Greater => Ok(Operator::Greater),
            other => Err(parse_error(format!(
                "expected comparison operator, found {:?}",
                other
            ))),
        }
    }

    fn parse_literal(&mut self) -> Result<LiteralValue> {
        match self.next()? {
            Token::StringLiteral(text) => Ok(LiteralValue::Text(text.clone())),
            Token::IntegerLiteral(value) => Ok(LiteralValue::Integer(*value)),
            Token::FloatLiteral(value) => Ok(LiteralValue::Float(*value)),
            Token::Identifier(word) if word.eq_ignore_ascii_case("null") => Ok(LiteralValue::Null),
            other => Err(parse_error(format!("expected literal, found {:?}", other))),
        }
    }

    fn eat_token(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}
