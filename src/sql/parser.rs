//! SQL Parser
//!
//! This module parses SQL tokens into a statement tree. It checks grammar
//! shape only; names and types are validated by the executor.

use super::ast::*;
use super::lexer::Lexer;
use super::token::Token;
use crate::catalog::{Column, DataType, TableSchema};
use crate::error::{Error, Result};

/// SQL Parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a SQL string
    pub fn new(sql: &str) -> Result<Self> {
        let mut lexer = Lexer::new(sql);
        let tokens = lexer.tokenize()?;

        Ok(Self::from_tokens(tokens))
    }

    /// Create a parser over an already lexed token stream
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parse exactly one SQL statement
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = self.parse_statement()?;

        // Consume optional semicolon
        if self.check(&Token::Semicolon) {
            self.advance();
        }

        if !self.is_at_end() {
            return Err(self.unexpected("end of input"));
        }

        Ok(stmt)
    }

    /// Parse a single statement
    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Create => self.parse_create_table().map(Statement::CreateTable),
            Token::Insert => self.parse_insert().map(Statement::Insert),
            Token::Select => self.parse_select().map(Statement::Select),
            Token::Update => self.parse_update().map(Statement::Update),
            Token::Delete => self.parse_delete().map(Statement::Delete),
            _ => Err(self.unexpected("CREATE, INSERT, SELECT, UPDATE or DELETE")),
        }
    }

    // ========== CREATE TABLE Statement ==========

    fn parse_create_table(&mut self) -> Result<TableSchema> {
        self.expect(&Token::Create)?;
        self.expect(&Token::Table)?;

        let table_name = self.expect_identifier()?;

        self.expect(&Token::LParen)?;
        let mut columns = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let data_type = self.parse_data_type()?;
            columns.push(Column::new(name, data_type));

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(&Token::RParen)?;

        Ok(TableSchema::new(table_name, columns))
    }

    fn parse_data_type(&mut self) -> Result<DataType> {
        let data_type = match self.current() {
            Token::Int => DataType::Int,
            Token::Float => DataType::Float,
            Token::Char => DataType::Char,
            Token::Identifier(name) => return Err(Error::UnknownDataType(name.clone())),
            _ => return Err(self.unexpected("data type (INT, FLOAT or CHAR)")),
        };
        self.advance();
        Ok(data_type)
    }

    // ========== INSERT Statement ==========

    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect(&Token::Insert)?;
        self.expect(&Token::Into)?;

        let table_name = self.expect_identifier()?;

        self.expect(&Token::Values)?;
        self.expect(&Token::LParen)?;
        let mut values = Vec::new();
        loop {
            values.push(self.parse_value()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(&Token::RParen)?;

        Ok(InsertStatement { table_name, values })
    }

    // ========== SELECT Statement ==========

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(&Token::Select)?;

        let columns = if self.check(&Token::Star) {
            self.advance();
            Projection::Wildcard
        } else {
            let mut columns = Vec::new();
            loop {
                columns.push(self.parse_column_ref()?);

                if !self.check(&Token::Comma) {
                    break;
                }
                self.advance();
            }
            Projection::Columns(columns)
        };

        self.expect(&Token::From)?;

        let mut tables = Vec::new();
        loop {
            tables.push(self.expect_identifier()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        let conditions = self.parse_where()?;

        Ok(SelectStatement {
            columns,
            tables,
            conditions,
        })
    }

    // ========== UPDATE Statement ==========

    fn parse_update(&mut self) -> Result<UpdateStatement> {
        self.expect(&Token::Update)?;

        let table_name = self.expect_identifier()?;

        self.expect(&Token::Set)?;
        let column = self.expect_identifier()?;
        self.expect(&Token::Eq)?;

        let value = if let Token::Identifier(_) = self.current() {
            let source_column = self.expect_identifier()?;
            let op = self.parse_arith_op()?;
            let operand = self.parse_numeric_value()?;
            Assignment::Arithmetic(UpdateExpr {
                source_column,
                op,
                operand,
            })
        } else {
            Assignment::Literal(self.parse_value()?)
        };

        let conditions = self.parse_where()?;

        Ok(UpdateStatement {
            table_name,
            column,
            value,
            conditions,
        })
    }

    fn parse_arith_op(&mut self) -> Result<ArithOp> {
        let op = match self.current() {
            Token::Plus => ArithOp::Add,
            Token::Minus => ArithOp::Sub,
            Token::Multiply => ArithOp::Mul,
            Token::Slash => ArithOp::Div,
            _ => return Err(self.unexpected("arithmetic operator (+, -, *, /)")),
        };
        self.advance();
        Ok(op)
    }

    // ========== DELETE Statement ==========

    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect(&Token::Delete)?;
        self.expect(&Token::From)?;

        let table_name = self.expect_identifier()?;
        let conditions = self.parse_where()?;

        Ok(DeleteStatement {
            table_name,
            conditions,
        })
    }

    // ========== WHERE clause ==========

    /// Parse an optional WHERE clause into a flat condition list
    fn parse_where(&mut self) -> Result<Vec<Condition>> {
        let mut conditions = Vec::new();
        if !self.check(&Token::Where) {
            return Ok(conditions);
        }
        self.advance();

        loop {
            let mut condition = self.parse_condition()?;

            let logic_op = match self.current() {
                Token::And => LogicOp::And,
                Token::Or => LogicOp::Or,
                _ => {
                    conditions.push(condition);
                    break;
                }
            };
            self.advance();
            condition.logic_op = Some(logic_op);
            conditions.push(condition);
        }

        Ok(conditions)
    }

    fn parse_condition(&mut self) -> Result<Condition> {
        let column = self.parse_column_ref()?;
        let op = self.parse_compare_op()?;

        let value = if let Token::Identifier(_) = self.current() {
            Operand::Column(self.parse_column_ref()?)
        } else {
            Operand::Literal(self.parse_value()?)
        };

        Ok(Condition {
            column,
            op,
            value,
            logic_op: None,
        })
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp> {
        let op = match self.current() {
            Token::Eq => CompareOp::Eq,
            Token::Neq => CompareOp::NotEq,
            Token::Lt => CompareOp::Lt,
            Token::Gt => CompareOp::Gt,
            Token::Lte => CompareOp::LtEq,
            Token::Gte => CompareOp::GtEq,
            _ => return Err(self.unexpected("comparison operator (=, <>, <, >, <=, >=)")),
        };
        self.advance();
        Ok(op)
    }

    // ========== Helper functions ==========

    /// `name` or `table.name`
    fn parse_column_ref(&mut self) -> Result<ColumnRef> {
        let first = self.expect_identifier()?;
        if self.check(&Token::Dot) {
            self.advance();
            let column = self.expect_identifier()?;
            return Ok(ColumnRef::qualified(first, column));
        }
        Ok(ColumnRef::new(first))
    }

    /// String literal, or a number with an optional leading minus
    fn parse_value(&mut self) -> Result<Value> {
        if let Token::StringLiteral(s) = self.current().clone() {
            self.advance();
            return Ok(Value::Str(s));
        }
        self.parse_numeric_value()
    }

    fn parse_numeric_value(&mut self) -> Result<Value> {
        let negative = if self.check(&Token::Minus) {
            self.advance();
            true
        } else {
            false
        };

        let value = match self.current() {
            Token::IntegerLiteral(n) if negative => Value::Int(-*n),
            Token::IntegerLiteral(n) => Value::Int(*n),
            Token::FloatLiteral(n) if negative => Value::Float(-*n),
            Token::FloatLiteral(n) => Value::Float(*n),
            _ if negative => return Err(self.unexpected("number")),
            _ => return Err(self.unexpected("value")),
        };
        self.advance();
        Ok(value)
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Error naming the current token, or end of input
    fn unexpected(&self, expected: &str) -> Error {
        if self.is_at_end() {
            Error::UnexpectedEof(expected.to_string())
        } else {
            Error::UnexpectedToken {
                expected: expected.to_string(),
                found: self.current().to_string(),
            }
        }
    }
}

/// Lex and parse one statement
pub fn parse_sql(sql: &str) -> Result<Statement> {
    Parser::new(sql)?.parse()
}
