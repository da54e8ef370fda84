//! The parser implementation.

use std::mem;
use std::thread;

use crate::ast::{
    AddColumn, BinaryOp, ColumnDefinition, CompareOp, Condition, CreateTable, DataType,
    DropColumn, DropTable, Expr, Field, Insert, Join, JoinType, OrderBy, OrderDirection,
    Parameter, Program, RenameColumn, RenameTable, Select, Statement, TableConstraint,
    TableTarget, UnaryOp,
};
use crate::error::Error;
use crate::lexer::{lex, Token, TokenKind};
use crate::stream::{token_channel, TokenStream};

use super::error::ParseError;

/// Parses a SQL text into a [`Program`].
///
/// The lexer runs on its own thread, streaming tokens through a
/// bounded buffer that the parser consumes; tokens arrive in strict
/// emission order. A parse error wins over a lexer error. A lexer
/// error surfaces when the parser itself succeeds (its view of the
/// input simply ended early).
///
/// # Errors
///
/// Returns [`Error::Lex`] or [`Error::Parse`] on invalid input.
pub fn parse(sql: &str) -> Result<Program, Error> {
    thread::scope(|scope| {
        let (writer, reader) = token_channel();
        let lexer = scope.spawn(move || lex(sql, |token| writer.write(token)));

        let mut parser = Parser::new(reader);
        let parsed = parser.run();
        // Dropping the reader unblocks a lexer waiting on a full
        // buffer after an early parse error.
        drop(parser);
        let lexed = lexer.join().expect("lexer thread panicked");

        match parsed {
            Ok(program) => {
                lexed?;
                Ok(program)
            }
            Err(err) => Err(err.into()),
        }
    })
}

struct Parser {
    reader: TokenStream,
    parameters: Vec<Parameter>,
}

/// Inline column constraints that contribute table-level facts rather
/// than fields on the column itself.
struct ColumnFlags {
    primary_key: bool,
    unique: bool,
}

impl Parser {
    fn new(reader: TokenStream) -> Self {
        Self {
            reader,
            parameters: Vec::new(),
        }
    }

    // ----- token plumbing -------------------------------------------------

    fn next(&mut self) -> Result<Option<Token>, ParseError> {
        Ok(self.reader.next()?)
    }

    fn peek(&mut self) -> Result<Option<Token>, ParseError> {
        Ok(self.reader.peek()?)
    }

    /// Consumes the next token, failing with an EOF error if there is
    /// none.
    fn require(&mut self, expected: &str) -> Result<Token, ParseError> {
        self.next()?
            .ok_or_else(|| ParseError::unexpected_eof(expected))
    }

    /// Consumes the next token and checks it is exactly `kind`.
    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        let expected = kind.to_string();
        let tok = self.require(&expected)?;
        if &tok.kind == kind {
            Ok(tok)
        } else {
            Err(ParseError::unexpected(&expected, &tok))
        }
    }

    /// Consumes the next token and returns its word value.
    fn expect_name(&mut self, what: &str) -> Result<String, ParseError> {
        let tok = self.require(what)?;
        match tok.kind {
            TokenKind::Word(word) => Ok(word),
            _ => Err(ParseError::unexpected(what, &tok)),
        }
    }

    /// Consumes the next token and checks it is the given keyword
    /// (case-insensitive).
    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        let expected = format!("`{keyword}`");
        let tok = self.require(&expected)?;
        if tok.is_word(keyword) {
            Ok(())
        } else {
            Err(ParseError::unexpected(&expected, &tok))
        }
    }

    /// Consumes the next token iff it is the given keyword.
    fn check_word(&mut self, keyword: &str) -> Result<bool, ParseError> {
        if self.peek()?.is_some_and(|t| t.is_word(keyword)) {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consumes the next token iff it is exactly `kind`.
    fn check(&mut self, kind: &TokenKind) -> Result<bool, ParseError> {
        if self.peek()?.is_some_and(|t| &t.kind == kind) {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn found_parameter(&mut self, name: &str) {
        if !self.parameters.iter().any(|p| p.name == name) {
            self.parameters.push(Parameter {
                name: name.to_string(),
            });
        }
    }

    // ----- top level ------------------------------------------------------

    fn run(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();

        while let Some(token) = self.next()? {
            statements.push(self.parse_statement(&token)?);

            match self.peek()? {
                None => {}
                Some(t) if t.kind == TokenKind::Semicolon => {
                    self.next()?;
                }
                Some(t) => return Err(ParseError::unexpected("`;` or end of input", &t)),
            }
        }

        Ok(Program {
            statements,
            parameters: mem::take(&mut self.parameters),
        })
    }

    fn parse_statement(&mut self, first: &Token) -> Result<Statement, ParseError> {
        if first.is_word("SELECT") {
            return Ok(Statement::Select(self.parse_select()?));
        }
        if first.is_word("INSERT") {
            return Ok(Statement::Insert(self.parse_insert()?));
        }
        if first.is_word("CREATE") {
            self.expect_keyword("TABLE")?;
            return Ok(Statement::CreateTable(self.parse_create_table()?));
        }
        if first.is_word("ALTER") {
            self.expect_keyword("TABLE")?;
            return self.parse_alter_table();
        }
        if first.is_word("DROP") {
            self.expect_keyword("TABLE")?;
            let table = self.expect_name("table name")?;
            return Ok(Statement::DropTable(DropTable { table }));
        }
        Err(ParseError::unexpected("start of statement", first))
    }

    // ----- SELECT ---------------------------------------------------------

    /// Parses the remainder of a `SELECT` statement; the keyword
    /// itself has already been consumed.
    fn parse_select(&mut self) -> Result<Select, ParseError> {
        let fields = self.parse_field_list()?;
        let from = self.parse_target()?;
        let joins = self.parse_joins()?;
        let where_clause = if self.check_word("WHERE")? {
            Some(self.parse_condition()?)
        } else {
            None
        };
        let having = if self.check_word("HAVING")? {
            Some(self.parse_condition()?)
        } else {
            None
        };
        let order_by = self.parse_order_by()?;
        let limit = self.parse_limit()?;

        Ok(Select {
            fields,
            from,
            joins,
            where_clause,
            having,
            order_by,
            limit,
        })
    }

    /// Parses the output list and consumes the terminating `FROM`.
    fn parse_field_list(&mut self) -> Result<Vec<Field>, ParseError> {
        let mut fields = Vec::new();
        loop {
            let expr = self.parse_expr()?;
            let tok = self.require("`,`, `AS`, or `FROM`")?;

            if tok.kind == TokenKind::Comma {
                fields.push(Field { expr, alias: None });
                continue;
            }
            if tok.is_word("AS") {
                let alias = self.expect_name("alias")?;
                fields.push(Field {
                    expr,
                    alias: Some(alias),
                });
                let tok = self.require("`,` or `FROM`")?;
                if tok.kind == TokenKind::Comma {
                    continue;
                }
                if tok.is_word("FROM") {
                    break;
                }
                return Err(ParseError::unexpected("`,` or `FROM`", &tok));
            }
            if tok.is_word("FROM") {
                fields.push(Field { expr, alias: None });
                break;
            }
            return Err(ParseError::unexpected("`,`, `AS`, or `FROM`", &tok));
        }
        Ok(fields)
    }

    /// Parses a table name or parenthesized subselect, plus an
    /// optional trailing alias. Subselects must be aliased.
    fn parse_target(&mut self) -> Result<TableTarget, ParseError> {
        let tok = self.require("table name or subselect")?;
        match tok.kind {
            TokenKind::Word(name) => {
                let alias = self.maybe_alias()?;
                Ok(TableTarget::Table { name, alias })
            }
            TokenKind::LParen => {
                let select = self.require("`SELECT`")?;
                if !select.is_word("SELECT") {
                    return Err(ParseError::unexpected(
                        "a subselect after `(`",
                        &select,
                    ));
                }
                let query = self.parse_select()?;
                self.expect(&TokenKind::RParen)?;
                let Some(alias) = self.maybe_alias()? else {
                    return Err(ParseError::new("subselect target requires an alias"));
                };
                Ok(TableTarget::Subquery {
                    query: Box::new(query),
                    alias,
                })
            }
            _ => Err(ParseError::unexpected("table name or subselect", &tok)),
        }
    }

    /// Consumes the next word as an alias unless it opens a later
    /// clause or a join.
    fn maybe_alias(&mut self) -> Result<Option<String>, ParseError> {
        let Some(tok) = self.peek()? else {
            return Ok(None);
        };
        let TokenKind::Word(word) = &tok.kind else {
            return Ok(None);
        };
        if is_reserved_after_target(word) {
            return Ok(None);
        }
        let alias = word.clone();
        self.next()?;
        Ok(Some(alias))
    }

    fn parse_joins(&mut self) -> Result<Vec<Join>, ParseError> {
        let mut joins = Vec::new();
        loop {
            let join_type = if self.check_word("LEFT")? {
                self.check_word("OUTER")?;
                self.expect_keyword("JOIN")?;
                JoinType::LeftOuter
            } else if self.check_word("RIGHT")? {
                self.check_word("OUTER")?;
                self.expect_keyword("JOIN")?;
                JoinType::RightOuter
            } else if self.check_word("FULL")? {
                self.check_word("OUTER")?;
                self.expect_keyword("JOIN")?;
                JoinType::FullOuter
            } else if self.check_word("INNER")? {
                self.expect_keyword("JOIN")?;
                JoinType::Inner
            } else if self.check_word("JOIN")? {
                JoinType::Inner
            } else if self.check_word("CROSS")? {
                self.expect_keyword("JOIN")?;
                JoinType::Cross
            } else {
                break;
            };

            let target = self.parse_target()?;
            let on = if join_type == JoinType::Cross {
                None
            } else {
                if !self.check_word("ON")? {
                    return Err(match self.peek()? {
                        Some(tok) => ParseError::unexpected("`ON` clause in join", &tok),
                        None => ParseError::unexpected_eof("`ON` clause in join"),
                    });
                }
                Some(self.parse_condition()?)
            };

            joins.push(Join {
                join_type,
                target,
                on,
            });
        }
        Ok(joins)
    }

    fn parse_order_by(&mut self) -> Result<Vec<OrderBy>, ParseError> {
        if !self.check_word("ORDER")? {
            return Ok(Vec::new());
        }
        self.expect_keyword("BY")?;

        let mut entries = Vec::new();
        loop {
            let expr = self.parse_expr()?;
            let direction = if self.check_word("DESC")? {
                OrderDirection::Desc
            } else {
                self.check_word("ASC")?;
                OrderDirection::Asc
            };
            entries.push(OrderBy { expr, direction });
            if !self.check(&TokenKind::Comma)? {
                break;
            }
        }
        Ok(entries)
    }

    fn parse_limit(&mut self) -> Result<Option<u64>, ParseError> {
        if !self.check_word("LIMIT")? {
            return Ok(None);
        }
        let tok = self.require("LIMIT value")?;
        match &tok.kind {
            TokenKind::Number(text) => text
                .parse::<u64>()
                .map(Some)
                .map_err(|_| ParseError::unexpected("integer LIMIT value", &tok)),
            TokenKind::Word(w) if w.eq_ignore_ascii_case("ALL") => Ok(None),
            _ => Err(ParseError::unexpected("number or `ALL` after LIMIT", &tok)),
        }
    }

    // ----- conditions -----------------------------------------------------

    /// Parses a condition. `AND` binds tighter than `OR`; both are
    /// left-associative.
    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        let mut left = self.parse_and_condition()?;
        while self.check_word("OR")? {
            let right = self.parse_and_condition()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn parse_and_condition(&mut self) -> Result<Condition, ParseError> {
        let mut left = self.parse_comparison()?;
        while self.check_word("AND")? {
            let right = self.parse_comparison()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Condition, ParseError> {
        let left = self.parse_expr()?;
        let tok = self.require("comparison operator")?;
        let op = match &tok.kind {
            TokenKind::Less => CompareOp::Lt,
            TokenKind::LessOrEqual => CompareOp::LtEq,
            TokenKind::Greater => CompareOp::Gt,
            TokenKind::GreaterOrEqual => CompareOp::GtEq,
            TokenKind::Equal => CompareOp::Eq,
            TokenKind::NotEqual => CompareOp::NotEq,
            TokenKind::Word(w) if w.eq_ignore_ascii_case("IS") => CompareOp::Is,
            _ => return Err(ParseError::unexpected("comparison operator", &tok)),
        };
        let right = self.parse_expr()?;
        Ok(Condition::Compare { left, op, right })
    }

    // ----- expressions ----------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_sub_expr()?;
        loop {
            let Some(tok) = self.peek()? else { break };
            let op = match tok.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::Asterisk => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.next()?;
            let right = self.parse_sub_expr()?;
            left = append_binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_sub_expr(&mut self) -> Result<Expr, ParseError> {
        let tok = self.require("expression")?;
        match &tok.kind {
            TokenKind::Parameter(name) => {
                let name = name.clone();
                self.found_parameter(&name);
                Ok(Expr::Parameter { name })
            }
            TokenKind::Number(text) => Ok(Expr::NumberLit(text.clone())),
            TokenKind::String(value) => Ok(Expr::StringLit(value.clone())),
            TokenKind::Minus => {
                let operand = self.parse_sub_expr()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Word(word) => {
                let word = word.clone();
                self.parse_column_or_call(word)
            }
            _ => Err(ParseError::unexpected("expression", &tok)),
        }
    }

    /// Disambiguates a leading word: `name`, `table.name`, or
    /// `function(args)`.
    fn parse_column_or_call(&mut self, first: String) -> Result<Expr, ParseError> {
        let Some(second) = self.peek()? else {
            return Ok(Expr::column(first));
        };
        if second.kind == TokenKind::Dot {
            self.next()?;
            let name = self.expect_name("column name")?;
            return Ok(Expr::qualified_column(first, name));
        }
        if second.kind == TokenKind::LParen {
            self.next()?;
            let args = self.parse_function_args()?;
            return Ok(Expr::Function { name: first, args });
        }
        Ok(Expr::column(first))
    }

    fn parse_function_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.check(&TokenKind::RParen)? {
            // no-argument call like NOW()
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            let tok = self.require("`,` or `)`")?;
            if tok.kind == TokenKind::Comma {
                continue;
            }
            if tok.kind == TokenKind::RParen {
                break;
            }
            return Err(ParseError::unexpected("`,` or `)`", &tok));
        }
        Ok(args)
    }

    // ----- INSERT ---------------------------------------------------------

    /// Parses the remainder of an `INSERT` statement.
    fn parse_insert(&mut self) -> Result<Insert, ParseError> {
        self.expect_keyword("INTO")?;
        let target = self.parse_target()?;
        if matches!(target, TableTarget::Subquery { .. }) {
            return Err(ParseError::new("cannot insert into a subselect"));
        }

        self.expect(&TokenKind::LParen)?;
        let mut columns = Vec::new();
        loop {
            let expr = self.parse_expr()?;
            let Expr::Column(mut column) = expr else {
                return Err(ParseError::new(
                    "INSERT target columns must be column names",
                ));
            };
            if column.table.is_none() {
                column.table = Some(target.key().to_string());
            }
            columns.push(column);

            let tok = self.require("`,` or `)`")?;
            if tok.kind == TokenKind::Comma {
                continue;
            }
            if tok.kind == TokenKind::RParen {
                break;
            }
            return Err(ParseError::unexpected("`,` or `)`", &tok));
        }

        self.expect_keyword("VALUES")?;
        self.expect(&TokenKind::LParen)?;
        let mut values = Vec::new();
        loop {
            values.push(self.parse_expr()?);
            let tok = self.require("`,` or `)`")?;
            if tok.kind == TokenKind::Comma {
                continue;
            }
            if tok.kind == TokenKind::RParen {
                break;
            }
            return Err(ParseError::unexpected("`,` or `)`", &tok));
        }

        Ok(Insert {
            target,
            columns,
            values,
        })
    }

    // ----- DDL ------------------------------------------------------------

    /// Parses the remainder of `ALTER TABLE`.
    fn parse_alter_table(&mut self) -> Result<Statement, ParseError> {
        let table = self.expect_name("table name")?;
        let action = self.require("`ADD`, `DROP`, or `RENAME`")?;

        if action.is_word("ADD") {
            self.expect_keyword("COLUMN")?;
            let (column, _) = self.parse_column_def()?;
            return Ok(Statement::AddColumn(AddColumn { table, column }));
        }
        if action.is_word("DROP") {
            self.expect_keyword("COLUMN")?;
            let column = self.expect_name("column name")?;
            return Ok(Statement::DropColumn(DropColumn { table, column }));
        }
        if action.is_word("RENAME") {
            if self.check_word("COLUMN")? {
                let from = self.expect_name("column name")?;
                self.expect_keyword("TO")?;
                let to = self.expect_name("column name")?;
                return Ok(Statement::RenameColumn(RenameColumn { table, from, to }));
            }
            self.expect_keyword("TO")?;
            let to = self.expect_name("table name")?;
            return Ok(Statement::RenameTable(RenameTable { from: table, to }));
        }
        Err(ParseError::unexpected("`ADD`, `DROP`, or `RENAME`", &action))
    }

    /// Parses the remainder of `CREATE TABLE`.
    fn parse_create_table(&mut self) -> Result<CreateTable, ParseError> {
        let name = self.expect_name("table name")?;
        self.expect(&TokenKind::LParen)?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        loop {
            // Zero columns is allowed.
            if self.check(&TokenKind::RParen)? {
                break;
            }

            // Table-level `PRIMARY KEY (...)` and `CONSTRAINT ...`
            // definitions carry nothing the model needs.
            if self
                .peek()?
                .is_some_and(|t| t.is_word("PRIMARY") || t.is_word("CONSTRAINT"))
            {
                if self.skip_constraint_def()? {
                    continue;
                }
                break;
            }

            let (column, flags) = self.parse_column_def()?;
            if flags.primary_key {
                constraints.push(TableConstraint::primary_key(vec![column.name.clone()]));
            }
            if flags.unique {
                constraints.push(TableConstraint::unique(vec![column.name.clone()]));
            }
            columns.push(column);

            let tok = self.require("`,` or `)`")?;
            if tok.kind == TokenKind::Comma {
                continue;
            }
            if tok.kind == TokenKind::RParen {
                break;
            }
            return Err(ParseError::unexpected("`,` or `)`", &tok));
        }

        Ok(CreateTable {
            name,
            columns,
            constraints,
        })
    }

    /// Skips a table-level constraint definition through the next
    /// top-level comma (returns true) or the closing paren of the
    /// column list (returns false), tracking nested parens.
    fn skip_constraint_def(&mut self) -> Result<bool, ParseError> {
        let mut depth = 0u32;
        loop {
            let tok = self.require("rest of constraint definition")?;
            match tok.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    if depth == 0 {
                        return Ok(false);
                    }
                    depth -= 1;
                }
                TokenKind::Comma if depth == 0 => return Ok(true),
                _ => {}
            }
        }
    }

    /// Parses `name type [ '(' n [, m] ')' ] constraint*`. Terminating
    /// commas and parens are left for the caller.
    fn parse_column_def(&mut self) -> Result<(ColumnDefinition, ColumnFlags), ParseError> {
        let name = self.expect_name("column name")?;
        let type_tok = self.require("data type")?;
        let Some(data_type) = type_tok.as_word().and_then(DataType::from_word) else {
            return Err(ParseError::unexpected("data type", &type_tok));
        };
        let mut column = ColumnDefinition::new(name, data_type);

        if self.check(&TokenKind::LParen)? {
            column.param1 = Some(self.expect_type_param()?);
            if self.check(&TokenKind::Comma)? {
                column.param2 = Some(self.expect_type_param()?);
            }
            self.expect(&TokenKind::RParen)?;
        }

        let flags = self.parse_column_constraints(&mut column)?;
        Ok((column, flags))
    }

    fn expect_type_param(&mut self) -> Result<u32, ParseError> {
        let tok = self.require("numeric type parameter")?;
        let TokenKind::Number(text) = &tok.kind else {
            return Err(ParseError::unexpected("numeric type parameter", &tok));
        };
        text.parse()
            .map_err(|_| ParseError::unexpected("integer type parameter", &tok))
    }

    fn parse_column_constraints(
        &mut self,
        column: &mut ColumnDefinition,
    ) -> Result<ColumnFlags, ParseError> {
        let mut flags = ColumnFlags {
            primary_key: false,
            unique: false,
        };
        let mut saw_nullability = false;

        loop {
            if self.check_word("NULL")? {
                if saw_nullability {
                    return Err(ParseError::new(
                        "null constraint specified more than once",
                    ));
                }
                saw_nullability = true;
                column.nullable = true;
            } else if self.check_word("NOT")? {
                self.expect_keyword("NULL")?;
                if saw_nullability {
                    return Err(ParseError::new(
                        "null constraint specified more than once",
                    ));
                }
                saw_nullability = true;
                column.nullable = false;
            } else if self.check_word("PRIMARY")? {
                self.expect_keyword("KEY")?;
                if flags.primary_key {
                    return Err(ParseError::new("PRIMARY KEY specified more than once"));
                }
                flags.primary_key = true;
            } else if self.check_word("UNIQUE")? {
                if flags.unique {
                    return Err(ParseError::new("UNIQUE specified more than once"));
                }
                flags.unique = true;
            } else if self.check_word("DEFAULT")? {
                let tok = self.require("default value")?;
                column.default = Some(match &tok.kind {
                    TokenKind::Word(w) => w.clone(),
                    TokenKind::Number(n) => n.clone(),
                    TokenKind::String(s) => format!("'{s}'"),
                    _ => return Err(ParseError::unexpected("default value", &tok)),
                });
            } else {
                break;
            }
        }
        Ok(flags)
    }
}

/// Appends `op right` to the expression parsed so far, keeping the
/// tree consistent with operator precedence. When the accumulated
/// expression is a binary node whose operator binds strictly looser
/// than `op`, the tree rotates so the new operator forms the inner
/// right subtree; otherwise the accumulated expression becomes the
/// left operand (left associativity).
fn append_binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    if let Expr::Binary {
        left: outer_left,
        op: outer_op,
        right: outer_right,
    } = left
    {
        if outer_op.precedence() < op.precedence() {
            return Expr::Binary {
                left: outer_left,
                op: outer_op,
                right: Box::new(Expr::Binary {
                    left: outer_right,
                    op,
                    right: Box::new(right),
                }),
            };
        }
        return Expr::Binary {
            left: Box::new(Expr::Binary {
                left: outer_left,
                op: outer_op,
                right: outer_right,
            }),
            op,
            right: Box::new(right),
        };
    }
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

/// Words that end a target-table position instead of naming an alias.
fn is_reserved_after_target(word: &str) -> bool {
    matches!(
        word.to_ascii_uppercase().as_str(),
        "INNER"
            | "LEFT"
            | "RIGHT"
            | "FULL"
            | "CROSS"
            | "JOIN"
            | "ON"
            | "WHERE"
            | "HAVING"
            | "GROUP"
            | "ORDER"
            | "LIMIT"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ColumnRef;

    fn parse_one(sql: &str) -> Statement {
        let program = parse(sql).expect("parse failed");
        assert_eq!(program.statements.len(), 1);
        program.statements.into_iter().next().unwrap()
    }

    fn parse_select(sql: &str) -> Select {
        match parse_one(sql) {
            Statement::Select(s) => s,
            other => panic!("expected SELECT, got {other:?}"),
        }
    }

    fn parse_expr(sql: &str) -> Expr {
        let select = parse_select(&format!("SELECT {sql} FROM t"));
        select.fields.into_iter().next().unwrap().expr
    }

    #[test]
    fn test_basic_select() {
        let select = parse_select("SELECT foo FROM bar");
        assert_eq!(select.fields.len(), 1);
        assert_eq!(select.fields[0].expr, Expr::column("foo"));
        assert_eq!(select.fields[0].alias, None);
        assert_eq!(select.from, TableTarget::table("bar"));
        assert!(select.joins.is_empty());
        assert!(select.where_clause.is_none());
        assert_eq!(select.limit, None);
    }

    #[test]
    fn test_parameterized_where() {
        let program = parse("SELECT foo FROM bar WHERE id=$my_id").unwrap();
        assert_eq!(program.parameters.len(), 1);
        assert_eq!(program.parameters[0].name, "my_id");

        let Statement::Select(select) = &program.statements[0] else {
            panic!("expected SELECT");
        };
        let Some(Condition::Compare { left, op, right }) = &select.where_clause else {
            panic!("expected comparison in WHERE");
        };
        assert_eq!(*left, Expr::column("id"));
        assert_eq!(*op, CompareOp::Eq);
        assert_eq!(*right, Expr::parameter("my_id"));
    }

    #[test]
    fn test_parameters_deduplicated_in_order() {
        let program =
            parse("SELECT a FROM t WHERE x=$b AND y=$a AND z=$b AND w=$c").unwrap();
        let names: Vec<_> = program.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_multiple_statements() {
        let program = parse("SELECT foo FROM bar;\nSELECT hello FROM world;").unwrap();
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn test_missing_semicolon_between_statements() {
        assert!(parse("SELECT foo FROM bar SELECT x FROM y").is_err());
    }

    #[test]
    fn test_subselect_target() {
        let select = parse_select("SELECT things.foo AS stuff FROM (SELECT bar FROM blah) things");
        assert_eq!(select.fields[0].expr, Expr::qualified_column("things", "foo"));
        assert_eq!(select.fields[0].alias.as_deref(), Some("stuff"));

        let TableTarget::Subquery { query, alias } = &select.from else {
            panic!("expected subquery target");
        };
        assert_eq!(alias, "things");
        assert_eq!(query.from, TableTarget::table("blah"));
    }

    #[test]
    fn test_subselect_without_alias_is_error() {
        assert!(parse("SELECT a FROM (SELECT b FROM c)").is_err());
    }

    #[test]
    fn test_joins() {
        let select = parse_select(
            "SELECT u.name, g.name AS group_name \
             FROM users u \
             LEFT JOIN user_groups ug ON ug.user_id = u.id \
             LEFT OUTER JOIN groups g ON g.id = ug.group_id \
             WHERE u.id = 77",
        );
        assert_eq!(select.joins.len(), 2);
        assert_eq!(select.joins[0].join_type, JoinType::LeftOuter);
        assert_eq!(select.joins[1].join_type, JoinType::LeftOuter);
        assert_eq!(
            select.joins[0].target,
            TableTarget::Table {
                name: "user_groups".into(),
                alias: Some("ug".into()),
            }
        );
        let Some(Condition::Compare { left, op, right }) = &select.joins[0].on else {
            panic!("expected ON comparison");
        };
        assert_eq!(*left, Expr::qualified_column("ug", "user_id"));
        assert_eq!(*op, CompareOp::Eq);
        assert_eq!(*right, Expr::qualified_column("u", "id"));

        let Some(Condition::Compare { right, .. }) = &select.where_clause else {
            panic!("expected WHERE comparison");
        };
        assert_eq!(*right, Expr::NumberLit("77".into()));
    }

    #[test]
    fn test_bare_join_is_inner() {
        let select = parse_select("SELECT a FROM t JOIN u ON t.id = u.t_id");
        assert_eq!(select.joins.len(), 1);
        assert_eq!(select.joins[0].join_type, JoinType::Inner);
    }

    #[test]
    fn test_cross_join_has_no_on() {
        let select = parse_select("SELECT a FROM t CROSS JOIN u");
        assert_eq!(select.joins[0].join_type, JoinType::Cross);
        assert!(select.joins[0].on.is_none());
    }

    #[test]
    fn test_join_missing_on_is_error() {
        assert!(parse("SELECT a FROM t JOIN u WHERE x = 1").is_err());
    }

    #[test]
    fn test_limit() {
        assert_eq!(parse_select("SELECT a FROM t LIMIT 1").limit, Some(1));
        assert_eq!(parse_select("SELECT a FROM t LIMIT 20").limit, Some(20));
        assert_eq!(parse_select("SELECT a FROM t LIMIT ALL").limit, None);
        assert!(parse("SELECT a FROM t LIMIT oops").is_err());
    }

    #[test]
    fn test_order_by() {
        let select = parse_select("SELECT a FROM t ORDER BY a, b DESC LIMIT 3");
        assert_eq!(select.order_by.len(), 2);
        assert_eq!(select.order_by[0].direction, OrderDirection::Asc);
        assert_eq!(select.order_by[1].direction, OrderDirection::Desc);
        assert_eq!(select.limit, Some(3));
    }

    #[test]
    fn test_precedence_mul_after_add_rotates() {
        let expr = parse_expr("a + b * c");
        let Expr::Binary { left, op, right } = expr else {
            panic!("expected binary expression");
        };
        assert_eq!(op, BinaryOp::Add);
        assert_eq!(*left, Expr::column("a"));
        assert_eq!(
            *right,
            Expr::column("b").binary(BinaryOp::Mul, Expr::column("c"))
        );
    }

    #[test]
    fn test_precedence_add_after_mul_keeps_left() {
        let expr = parse_expr("a * b + c");
        assert_eq!(
            expr,
            Expr::column("a")
                .binary(BinaryOp::Mul, Expr::column("b"))
                .binary(BinaryOp::Add, Expr::column("c"))
        );
    }

    #[test]
    fn test_same_precedence_is_left_associative() {
        let expr = parse_expr("a - b + c");
        assert_eq!(
            expr,
            Expr::column("a")
                .binary(BinaryOp::Sub, Expr::column("b"))
                .binary(BinaryOp::Add, Expr::column("c"))
        );
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = parse_expr("(a + b) * c");
        assert_eq!(
            expr,
            Expr::column("a")
                .binary(BinaryOp::Add, Expr::column("b"))
                .binary(BinaryOp::Mul, Expr::column("c"))
        );
    }

    #[test]
    fn test_unary_negation() {
        let expr = parse_expr("-x");
        assert_eq!(
            expr,
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(Expr::column("x")),
            }
        );
    }

    #[test]
    fn test_function_call() {
        let expr = parse_expr("count(id)");
        assert_eq!(
            expr,
            Expr::Function {
                name: "count".into(),
                args: vec![Expr::column("id")],
            }
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let select = parse_select("SELECT a FROM t WHERE a = 1 OR b = 2 AND c = 3");
        let Some(Condition::Logical { op, right, .. }) = &select.where_clause else {
            panic!("expected logical condition");
        };
        assert_eq!(*op, crate::ast::LogicalOp::Or);
        assert!(matches!(
            **right,
            Condition::Logical {
                op: crate::ast::LogicalOp::And,
                ..
            }
        ));
    }

    #[test]
    fn test_insert() {
        let Statement::Insert(insert) =
            parse_one("INSERT INTO users (name, email) VALUES ('Ada', 'ada@example.com');")
        else {
            panic!("expected INSERT");
        };
        assert_eq!(insert.target, TableTarget::table("users"));
        assert_eq!(
            insert.columns,
            vec![
                ColumnRef::qualified("users", "name"),
                ColumnRef::qualified("users", "email"),
            ]
        );
        assert_eq!(
            insert.values,
            vec![
                Expr::StringLit("Ada".into()),
                Expr::StringLit("ada@example.com".into()),
            ]
        );
    }

    #[test]
    fn test_insert_into_subselect_is_error() {
        assert!(parse("INSERT INTO (SELECT a FROM t) x (a) VALUES (1)").is_err());
    }

    #[test]
    fn test_create_table() {
        let Statement::CreateTable(create) =
            parse_one("CREATE TABLE people(id int not null primary key, name varchar(200))")
        else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(create.name, "people");
        assert_eq!(create.columns.len(), 2);

        assert_eq!(create.columns[0].name, "id");
        assert_eq!(create.columns[0].data_type, DataType::Integer);
        assert_eq!(create.columns[0].param1, None);
        assert!(!create.columns[0].nullable);

        assert_eq!(create.columns[1].name, "name");
        assert_eq!(create.columns[1].data_type, DataType::VarChar);
        assert_eq!(create.columns[1].param1, Some(200));
        assert!(create.columns[1].nullable);

        assert_eq!(
            create.constraints,
            vec![TableConstraint::primary_key(vec!["id".into()])]
        );
    }

    #[test]
    fn test_create_table_skips_table_level_constraints() {
        let Statement::CreateTable(create) = parse_one(
            "CREATE TABLE m(user_id int, group_id int, \
             PRIMARY KEY (user_id, group_id), \
             CONSTRAINT fk FOREIGN KEY (user_id) REFERENCES users (id))",
        ) else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(create.columns.len(), 2);
        assert!(create.constraints.is_empty());
    }

    #[test]
    fn test_create_table_unknown_type_is_error() {
        assert!(parse("CREATE TABLE t(a blob)").is_err());
    }

    #[test]
    fn test_duplicate_null_constraint_is_error() {
        assert!(parse("CREATE TABLE t(a int null not null)").is_err());
    }

    #[test]
    fn test_add_column() {
        let Statement::AddColumn(add) =
            parse_one("ALTER TABLE people ADD COLUMN name VARCHAR(200) NOT NULL")
        else {
            panic!("expected ADD COLUMN");
        };
        assert_eq!(add.table, "people");
        assert_eq!(add.column.name, "name");
        assert_eq!(add.column.data_type, DataType::VarChar);
        assert_eq!(add.column.param1, Some(200));
        assert!(!add.column.nullable);
    }

    #[test]
    fn test_drop_and_rename_statements() {
        assert_eq!(
            parse_one("ALTER TABLE t DROP COLUMN c"),
            Statement::DropColumn(DropColumn {
                table: "t".into(),
                column: "c".into(),
            })
        );
        assert_eq!(
            parse_one("ALTER TABLE t RENAME COLUMN a TO b"),
            Statement::RenameColumn(RenameColumn {
                table: "t".into(),
                from: "a".into(),
                to: "b".into(),
            })
        );
        assert_eq!(
            parse_one("ALTER TABLE t RENAME TO u"),
            Statement::RenameTable(RenameTable {
                from: "t".into(),
                to: "u".into(),
            })
        );
        assert_eq!(
            parse_one("DROP TABLE t"),
            Statement::DropTable(DropTable { table: "t".into() })
        );
    }

    #[test]
    fn test_default_constraint() {
        let Statement::CreateTable(create) =
            parse_one("CREATE TABLE t(ts timestamptz DEFAULT now, n int DEFAULT 0)")
        else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(create.columns[0].default.as_deref(), Some("now"));
        assert_eq!(create.columns[1].default.as_deref(), Some("0"));
    }

    #[test]
    fn test_parse_error_wins_over_later_lex_error() {
        // The `;;` parse error must be reported even though the
        // unterminated string would also be a lex error.
        let err = parse("SELECT a FROM t;; SELECT 'oops FROM t").unwrap_err();
        assert!(err.to_string().contains("parse error"), "got: {err}");
    }

    #[test]
    fn test_lex_error_surfaces_when_parser_is_fine() {
        let err = parse("'foo").unwrap_err();
        assert!(err.to_string().contains("lex error"), "got: {err}");
    }

    #[test]
    fn test_statement_must_start_with_keyword() {
        assert!(parse("42 FROM t").is_err());
        assert!(parse(";").is_err());
    }
}
