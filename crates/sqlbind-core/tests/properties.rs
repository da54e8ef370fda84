//! Property tests for the pipeline's laws.

use proptest::prelude::*;

use sqlbind_core::ast::{BinaryOp, Expr, Statement};
use sqlbind_core::lexer::{tokenize, Location, Token, TokenKind};
use sqlbind_core::stream::token_channel;
use sqlbind_core::{model_from_migrations, parse, Migration};

fn piece() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6}",
        "[0-9]{1,4}",
        Just("(".to_string()),
        Just(")".to_string()),
        Just(",".to_string()),
        Just("<=".to_string()),
        Just("<>".to_string()),
        Just("=".to_string()),
        "'[a-z]{0,5}'",
    ]
}

fn whitespace() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(" ".to_string()),
        Just("  ".to_string()),
        Just("\n".to_string()),
        Just("\t".to_string()),
    ]
}

fn binary_op() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::Add),
        Just(BinaryOp::Sub),
        Just(BinaryOp::Mul),
        Just(BinaryOp::Div),
    ]
}

/// Builds the expected tree for `x0 op0 x1 op1 x2 ...` with `*`/`/`
/// binding tighter than `+`/`-` and everything left-associative.
fn reference_tree(names: &[String], ops: &[BinaryOp]) -> Expr {
    let mut sums: Vec<Expr> = Vec::new();
    let mut sum_ops: Vec<BinaryOp> = Vec::new();
    let mut current = Expr::column(names[0].clone());

    for (i, op) in ops.iter().enumerate() {
        let next = Expr::column(names[i + 1].clone());
        match op {
            BinaryOp::Mul | BinaryOp::Div => current = current.binary(*op, next),
            BinaryOp::Add | BinaryOp::Sub => {
                sums.push(current);
                sum_ops.push(*op);
                current = next;
            }
        }
    }
    sums.push(current);

    let mut result = sums.remove(0);
    for (term, op) in sums.into_iter().zip(sum_ops) {
        result = result.binary(op, term);
    }
    result
}

proptest! {
    #[test]
    fn prop_token_locations_monotonic(
        pieces in prop::collection::vec((piece(), whitespace()), 1..20)
    ) {
        let mut sql = String::new();
        for (piece, ws) in &pieces {
            sql.push_str(piece);
            sql.push_str(ws);
        }

        let tokens = tokenize(&sql).unwrap();
        prop_assert_eq!(tokens.len(), pieces.len());
        for pair in tokens.windows(2) {
            let (a, b) = (pair[0].location, pair[1].location);
            prop_assert!(
                (a.line, a.column) < (b.line, b.column),
                "{} does not precede {}", a, b
            );
        }
    }

    #[test]
    fn prop_parameters_deduplicated_in_order(
        names in prop::collection::vec("[a-z]{1,4}", 1..10)
    ) {
        let clauses: Vec<String> = names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("c{i} = ${name}"))
            .collect();
        let sql = format!("SELECT a FROM t WHERE {}", clauses.join(" AND "));
        let program = parse(&sql).unwrap();

        let mut expected: Vec<&str> = Vec::new();
        for name in &names {
            if !expected.contains(&name.as_str()) {
                expected.push(name);
            }
        }
        let actual: Vec<&str> = program.parameters.iter().map(|p| p.name.as_str()).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_expression_precedence(ops in prop::collection::vec(binary_op(), 1..6)) {
        let names: Vec<String> = (0..=ops.len()).map(|i| format!("x{i}")).collect();
        let mut rendered = names[0].clone();
        for (op, name) in ops.iter().zip(names.iter().skip(1)) {
            rendered.push_str(&format!(" {} {}", op.as_str(), name));
        }

        let program = parse(&format!("SELECT {rendered} FROM t")).unwrap();
        let Statement::Select(select) = &program.statements[0] else {
            panic!("expected SELECT");
        };
        prop_assert_eq!(&select.fields[0].expr, &reference_tree(&names, &ops));
    }

    #[test]
    fn prop_model_fold_is_deterministic(
        tables in prop::collection::vec(("[a-z]{1,5}", 1..4usize), 1..5)
    ) {
        let statements: Vec<String> = tables
            .iter()
            .map(|(name, columns)| {
                let columns: Vec<String> =
                    (0..*columns).map(|i| format!("c{i} INT")).collect();
                format!("CREATE TABLE {name} ({});", columns.join(", "))
            })
            .collect();
        let migrations = vec![Migration {
            name: "0001_everything".into(),
            up_sql: statements.join("\n"),
            down_sql: String::new(),
        }];

        let first = model_from_migrations(&migrations).map_err(|e| e.to_string());
        let second = model_from_migrations(&migrations).map_err(|e| e.to_string());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_peek_next_agreement(words in prop::collection::vec("[a-z]{1,5}", 0..20)) {
        let (writer, mut stream) = token_channel();
        for word in &words {
            writer.write(Token::new(TokenKind::Word(word.clone()), Location::start()));
        }
        drop(writer);

        let mut seen = 0;
        loop {
            let peeked = stream.peek().unwrap();
            let next = stream.next().unwrap();
            prop_assert_eq!(&peeked, &next);
            if next.is_none() {
                break;
            }
            seen += 1;
        }
        prop_assert_eq!(seen, words.len());
    }
}
