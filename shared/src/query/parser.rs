//! SQL parser using nom.
//!
//! Parses the SELECT dialect accepted by OpenObserve, for example:
//! - `SELECT * FROM logs`
//! - `SELECT level, count(*) AS c FROM logs WHERE code >= 500 GROUP BY level`
//! - `SELECT * FROM logs WHERE msg ~ 'timeout' ORDER BY _timestamp DESC LIMIT 100`
//! - `WITH e AS (SELECT * FROM logs WHERE code >= 500) SELECT host, count(*) FROM e GROUP BY host`
//! - `SELECT a FROM logs UNION ALL SELECT a FROM archive`
//!
//! Keywords are case-insensitive. Identifiers may be bare, double-quoted or
//! backtick-quoted. `--` and `/* */` comments count as whitespace.

use super::ast::{
    BinaryOperator, Cte, Expr, FrameBound, FrameUnits, Function, FunctionArg, Ident, Join,
    JoinOperator, Literal, ObjectName, OrderByExpr, Query, Select, SelectItem, SetExpr,
    SetOperator, SetQuantifier, SortOrder, TableFactor, TableWithJoins, UnaryOperator,
    WhenClause, WindowFrame, WindowSpec, With,
};
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_until, take_while},
    character::complete::{char, digit0, digit1, multispace1, one_of, satisfy},
    combinator::{consumed, map, opt, recognize, value},
    error::{Error as NomError, ErrorKind},
    multi::{many0, many1, separated_list0, separated_list1},
    sequence::preceded,
    IResult, Parser,
};
use thiserror::Error;

/// Errors that can occur during query parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The query is empty.
    #[error("Empty query")]
    EmptyQuery,

    /// The statement is not a query.
    #[error("Unsupported statement: expected SELECT, found '{0}'")]
    UnsupportedStatement(String),

    /// The query syntax is invalid.
    #[error("Invalid query syntax: {0}")]
    SyntaxError(String),
}

type Res<'a, T> = IResult<&'a str, T>;

/// Words that can never be used as bare identifiers or aliases.
const RESERVED: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "CROSS", "DESC", "DISTINCT",
    "ELSE", "END", "EXCEPT", "FALSE", "FROM", "FULL", "GROUP", "HAVING", "ILIKE", "IN", "INNER",
    "INTERSECT", "INTERVAL", "IS", "JOIN", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "NULLS",
    "OFFSET", "ON", "OR", "ORDER", "OUTER", "RIGHT", "SELECT", "THEN", "TRUE", "UNION", "WHEN",
    "WHERE", "WITH",
];

/// Parses a single query statement, with an optional trailing `;`.
///
/// The statement is a SELECT, optionally preceded by a `WITH` clause and
/// combined with others through `UNION`, `EXCEPT` or `INTERSECT`.
///
/// # Errors
///
/// Returns a `ParseError` if:
/// - The query is empty
/// - The statement is not a query
/// - The syntax is invalid or there is unexpected trailing content
///
/// # Examples
///
/// ```
/// use shared::query::parse_statement;
///
/// let query = parse_statement("select * from logs where level = 'error' -- errors only").unwrap();
/// assert_eq!(query.to_string(), "SELECT * FROM logs WHERE level = 'error'");
/// ```
pub fn parse_statement(input: &str) -> Result<Query, ParseError> {
    let body = skip_ws(input);
    if skip_ws(body.strip_prefix(';').unwrap_or(body)).is_empty() {
        return Err(ParseError::EmptyQuery);
    }

    let starts_query = keyword("SELECT")(body).is_ok()
        || keyword("WITH")(body).is_ok()
        || body.starts_with('(');
    if !starts_query {
        let first_word = body.split_whitespace().next().unwrap_or_default();
        return Err(ParseError::UnsupportedStatement(first_word.to_string()));
    }

    match (query, opt(sym(";")), ws).parse(body) {
        Ok((remaining, (query, _, _))) => {
            if remaining.is_empty() {
                Ok(query)
            } else {
                Err(ParseError::SyntaxError(format!(
                    "Unexpected trailing content: '{}'",
                    snippet(remaining)
                )))
            }
        }
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(ParseError::SyntaxError(
            format!("unexpected input near '{}'", snippet(e.input)),
        )),
        Err(nom::Err::Incomplete(_)) => Err(ParseError::SyntaxError(
            "unexpected end of input".to_string(),
        )),
    }
}

fn snippet(input: &str) -> &str {
    let input = input.trim_start();
    match input.char_indices().nth(32) {
        Some((end, _)) => &input[..end],
        None => input,
    }
}

// ============================================================================
// Lexical helpers
// ============================================================================

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|reserved| reserved.eq_ignore_ascii_case(word))
}

/// Skips whitespace, `-- line` comments and `/* block */` comments.
fn ws(input: &str) -> Res<'_, &str> {
    recognize(many0(alt((
        multispace1,
        recognize((tag("--"), take_while(|c: char| c != '\n'))),
        recognize((tag("/*"), take_until("*/"), tag("*/"))),
    ))))
    .parse(input)
}

fn skip_ws(input: &str) -> &str {
    ws(input).map_or(input, |(rest, _)| rest)
}

fn error_at(input: &str) -> nom::Err<NomError<&str>> {
    nom::Err::Error(NomError::new(input, ErrorKind::Verify))
}

/// Matches a keyword case-insensitively, skipping leading whitespace and
/// refusing to match a prefix of a longer word.
fn keyword<'a>(word: &'static str) -> impl Fn(&'a str) -> Res<'a, &'a str> {
    move |input: &'a str| {
        let (input, _) = ws(input)?;
        let (rest, matched) = tag_no_case(word)(input)?;
        if rest.starts_with(is_ident_char) {
            return Err(error_at(input));
        }
        Ok((rest, matched))
    }
}

/// Matches a punctuation symbol after optional whitespace.
fn sym<'a>(symbol: &'static str) -> impl Fn(&'a str) -> Res<'a, &'a str> {
    move |input: &'a str| {
        let (input, _) = ws(input)?;
        tag(symbol)(input)
    }
}

fn ident(input: &str) -> Res<'_, Ident> {
    let (input, _) = ws(input)?;
    alt((quoted_ident('"'), quoted_ident('`'), bare_ident)).parse(input)
}

fn bare_ident(input: &str) -> Res<'_, Ident> {
    let (rest, word) = recognize((
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))
    .parse(input)?;
    if is_reserved(word) {
        return Err(error_at(input));
    }
    Ok((rest, Ident::new(word)))
}

fn quoted_ident<'a>(quote: char) -> impl Fn(&'a str) -> Res<'a, Ident> {
    move |input: &'a str| {
        let (input, _) = char(quote)(input)?;
        let (input, text) = take_while(|c: char| c != quote)(input)?;
        let (input, _) = char(quote)(input)?;
        Ok((input, Ident::with_quote(text, quote)))
    }
}

fn alias(input: &str) -> Res<'_, Ident> {
    alt((preceded(keyword("AS"), ident), ident)).parse(input)
}

fn data_type(input: &str) -> Res<'_, String> {
    let (input, _) = ws(input)?;
    let (input, name) = recognize((
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_ident_char),
        opt((
            sym("("),
            separated_list1(sym(","), preceded(ws, digit1)),
            sym(")"),
        )),
    ))
    .parse(input)?;
    Ok((input, name.to_string()))
}

// ============================================================================
// Query: WITH, set operations, ORDER BY, LIMIT
// ============================================================================

fn query(input: &str) -> Res<'_, Query> {
    let (input, with) = opt(with_clause).parse(input)?;
    let (input, body) = set_expr(input)?;

    let (input, order_by) = opt(preceded(
        (keyword("ORDER"), keyword("BY")),
        separated_list1(sym(","), order_by_expr),
    ))
    .parse(input)?;

    let (input, limit) = opt(preceded(keyword("LIMIT"), expr)).parse(input)?;
    let (input, offset) = opt(preceded(keyword("OFFSET"), expr)).parse(input)?;

    Ok((
        input,
        Query {
            with,
            body,
            order_by: order_by.unwrap_or_default(),
            limit,
            offset,
        },
    ))
}

fn with_clause(input: &str) -> Res<'_, With> {
    let (input, _) = keyword("WITH")(input)?;
    let (input, recursive) = opt(keyword("RECURSIVE")).parse(input)?;
    let (input, ctes) = separated_list1(sym(","), cte).parse(input)?;
    Ok((
        input,
        With {
            recursive: recursive.is_some(),
            ctes,
        },
    ))
}

fn cte(input: &str) -> Res<'_, Cte> {
    let (input, alias) = ident(input)?;
    let (input, columns) = opt((sym("("), separated_list1(sym(","), ident), sym(")")))
        .parse(input)?;
    let (input, _) = keyword("AS")(input)?;
    let (input, _) = sym("(")(input)?;
    let (input, query) = query(input)?;
    let (input, _) = sym(")")(input)?;
    Ok((
        input,
        Cte {
            alias,
            columns: columns.map(|(_, columns, _)| columns).unwrap_or_default(),
            query: Box::new(query),
        },
    ))
}

fn set_quantifier(input: &str) -> Res<'_, SetQuantifier> {
    map(
        opt(alt((
            value(SetQuantifier::All, keyword("ALL")),
            value(SetQuantifier::Distinct, keyword("DISTINCT")),
        ))),
        Option::unwrap_or_default,
    )
    .parse(input)
}

fn fold_set(first: SetExpr, rest: Vec<(SetOperator, SetQuantifier, SetExpr)>) -> SetExpr {
    rest.into_iter()
        .fold(first, |left, (op, quantifier, right)| SetExpr::SetOperation {
            left: Box::new(left),
            op,
            quantifier,
            right: Box::new(right),
        })
}

/// `UNION` and `EXCEPT`, which bind looser than `INTERSECT`.
fn set_expr(input: &str) -> Res<'_, SetExpr> {
    let (input, first) = intersect_expr(input)?;
    let (input, rest) = many0((
        alt((
            value(SetOperator::Union, keyword("UNION")),
            value(SetOperator::Except, keyword("EXCEPT")),
        )),
        set_quantifier,
        intersect_expr,
    ))
    .parse(input)?;
    Ok((input, fold_set(first, rest)))
}

fn intersect_expr(input: &str) -> Res<'_, SetExpr> {
    let (input, first) = set_primary(input)?;
    let (input, rest) = many0((
        value(SetOperator::Intersect, keyword("INTERSECT")),
        set_quantifier,
        set_primary,
    ))
    .parse(input)?;
    Ok((input, fold_set(first, rest)))
}

fn set_primary(input: &str) -> Res<'_, SetExpr> {
    alt((
        map(select_block, |select| SetExpr::Select(Box::new(select))),
        map((sym("("), query, sym(")")), |(_, query, _)| {
            SetExpr::Query(Box::new(query))
        }),
    ))
    .parse(input)
}

// ============================================================================
// SELECT block
// ============================================================================

fn select_block(input: &str) -> Res<'_, Select> {
    let (input, _) = keyword("SELECT")(input)?;
    let (input, distinct) = opt(keyword("DISTINCT")).parse(input)?;
    let (input, projection) = separated_list1(sym(","), select_item).parse(input)?;

    let (input, from) = opt(preceded(
        keyword("FROM"),
        separated_list1(sym(","), table_with_joins),
    ))
    .parse(input)?;

    let (input, selection) = opt(preceded(keyword("WHERE"), expr)).parse(input)?;

    let (input, group_by) = opt(preceded(
        (keyword("GROUP"), keyword("BY")),
        separated_list1(sym(","), expr),
    ))
    .parse(input)?;

    let (input, having) = opt(preceded(keyword("HAVING"), expr)).parse(input)?;

    Ok((
        input,
        Select {
            distinct: distinct.is_some(),
            projection,
            from: from.unwrap_or_default(),
            selection,
            group_by: group_by.unwrap_or_default(),
            having,
        },
    ))
}

fn select_item(input: &str) -> Res<'_, SelectItem> {
    alt((
        value(SelectItem::Wildcard, sym("*")),
        qualified_wildcard,
        expr_item,
    ))
    .parse(input)
}

fn qualified_wildcard(input: &str) -> Res<'_, SelectItem> {
    let (input, parts) = many1((ident, char('.'))).parse(input)?;
    let (input, _) = char('*')(input)?;
    let name = ObjectName(parts.into_iter().map(|(part, _)| part).collect());
    Ok((input, SelectItem::QualifiedWildcard(name)))
}

fn expr_item(input: &str) -> Res<'_, SelectItem> {
    let (input, _) = ws(input)?;
    let (input, (text, expr)) = consumed(expr).parse(input)?;
    let (input, alias) = opt(alias).parse(input)?;
    Ok((
        input,
        SelectItem::Expr {
            expr,
            alias,
            text: text.to_string(),
        },
    ))
}

// ============================================================================
// FROM clause
// ============================================================================

fn table_with_joins(input: &str) -> Res<'_, TableWithJoins> {
    let (input, relation) = table_factor(input)?;
    let (input, joins) = many0(join).parse(input)?;
    Ok((input, TableWithJoins { relation, joins }))
}

fn table_factor(input: &str) -> Res<'_, TableFactor> {
    alt((derived_table, named_table)).parse(input)
}

fn derived_table(input: &str) -> Res<'_, TableFactor> {
    let (input, _) = sym("(")(input)?;
    let (input, subquery) = query(input)?;
    let (input, _) = sym(")")(input)?;
    let (input, alias) = opt(alias).parse(input)?;
    Ok((
        input,
        TableFactor::Derived {
            subquery: Box::new(subquery),
            alias,
        },
    ))
}

fn named_table(input: &str) -> Res<'_, TableFactor> {
    let (input, parts) = separated_list1(char('.'), ident).parse(input)?;
    let (input, alias) = opt(alias).parse(input)?;
    Ok((
        input,
        TableFactor::Table {
            name: ObjectName(parts),
            alias,
        },
    ))
}

fn join(input: &str) -> Res<'_, Join> {
    let (input, operator) = join_operator(input)?;
    let (input, relation) = table_factor(input)?;
    let (input, constraint) = if operator == JoinOperator::Cross {
        (input, None)
    } else {
        opt(preceded(keyword("ON"), expr)).parse(input)?
    };
    Ok((
        input,
        Join {
            operator,
            relation,
            constraint,
        },
    ))
}

fn join_operator(input: &str) -> Res<'_, JoinOperator> {
    alt((
        value(
            JoinOperator::Inner,
            (opt(keyword("INNER")), keyword("JOIN")),
        ),
        value(
            JoinOperator::LeftOuter,
            (keyword("LEFT"), opt(keyword("OUTER")), keyword("JOIN")),
        ),
        value(
            JoinOperator::RightOuter,
            (keyword("RIGHT"), opt(keyword("OUTER")), keyword("JOIN")),
        ),
        value(
            JoinOperator::FullOuter,
            (keyword("FULL"), opt(keyword("OUTER")), keyword("JOIN")),
        ),
        value(JoinOperator::Cross, (keyword("CROSS"), keyword("JOIN"))),
    ))
    .parse(input)
}

// ============================================================================
// ORDER BY clause
// ============================================================================

fn order_by_expr(input: &str) -> Res<'_, OrderByExpr> {
    let (input, expr) = expr(input)?;
    let (input, order) = opt(alt((
        value(SortOrder::Asc, keyword("ASC")),
        value(SortOrder::Desc, keyword("DESC")),
    )))
    .parse(input)?;
    let (input, nulls_first) = opt(preceded(
        keyword("NULLS"),
        alt((value(true, keyword("FIRST")), value(false, keyword("LAST")))),
    ))
    .parse(input)?;
    Ok((
        input,
        OrderByExpr {
            expr,
            order,
            nulls_first,
        },
    ))
}

// ============================================================================
// Expressions, loosest binding first
// ============================================================================

fn fold_binary(first: Expr, rest: Vec<(BinaryOperator, Expr)>) -> Expr {
    rest.into_iter()
        .fold(first, |left, (op, right)| Expr::binary(left, op, right))
}

fn expr(input: &str) -> Res<'_, Expr> {
    or_expr(input)
}

fn or_expr(input: &str) -> Res<'_, Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(keyword("OR"), and_expr)).parse(input)?;
    let rest = rest.into_iter().map(|e| (BinaryOperator::Or, e)).collect();
    Ok((input, fold_binary(first, rest)))
}

fn and_expr(input: &str) -> Res<'_, Expr> {
    let (input, first) = not_expr(input)?;
    let (input, rest) = many0(preceded(keyword("AND"), not_expr)).parse(input)?;
    let rest = rest.into_iter().map(|e| (BinaryOperator::And, e)).collect();
    Ok((input, fold_binary(first, rest)))
}

fn not_expr(input: &str) -> Res<'_, Expr> {
    if let Ok((rest, _)) = keyword("NOT")(input) {
        let (rest, inner) = not_expr(rest)?;
        return Ok((rest, Expr::unary(UnaryOperator::Not, inner)));
    }
    predicate(input)
}

/// Comparison and the SQL predicate forms (`IS NULL`, `IN`, `BETWEEN`, `LIKE`).
fn predicate(input: &str) -> Res<'_, Expr> {
    let (input, left) = concat_expr(input)?;

    if let Ok((rest, _)) = keyword("IS")(input) {
        let (rest, negated) = opt(keyword("NOT")).parse(rest)?;
        let (rest, _) = keyword("NULL")(rest)?;
        return Ok((
            rest,
            Expr::IsNull {
                expr: Box::new(left),
                negated: negated.is_some(),
            },
        ));
    }

    let (after_not, negated) = match keyword("NOT")(input) {
        Ok((rest, _)) => (rest, true),
        Err(_) => (input, false),
    };

    if let Ok((rest, _)) = keyword("IN")(after_not) {
        return in_predicate(rest, left, negated);
    }

    if let Ok((rest, _)) = keyword("BETWEEN")(after_not) {
        let (rest, low) = concat_expr(rest)?;
        let (rest, _) = keyword("AND")(rest)?;
        let (rest, high) = concat_expr(rest)?;
        return Ok((
            rest,
            Expr::Between {
                expr: Box::new(left),
                negated,
                low: Box::new(low),
                high: Box::new(high),
            },
        ));
    }

    let like = alt((
        value(false, keyword("LIKE")),
        value(true, keyword("ILIKE")),
    ))
    .parse(after_not);
    if let Ok((rest, case_insensitive)) = like {
        let (rest, pattern) = concat_expr(rest)?;
        return Ok((
            rest,
            Expr::Like {
                expr: Box::new(left),
                negated,
                case_insensitive,
                pattern: Box::new(pattern),
            },
        ));
    }

    if !negated {
        if let Ok((rest, op)) = comparison_op(input) {
            let (rest, right) = concat_expr(rest)?;
            return Ok((rest, Expr::binary(left, op, right)));
        }
    }

    Ok((input, left))
}

fn in_predicate(input: &str, left: Expr, negated: bool) -> Res<'_, Expr> {
    let (input, _) = sym("(")(input)?;
    if let Ok((rest, subquery)) = query(input) {
        let (rest, _) = sym(")")(rest)?;
        return Ok((
            rest,
            Expr::InSubquery {
                expr: Box::new(left),
                subquery: Box::new(subquery),
                negated,
            },
        ));
    }
    let (input, list) = separated_list1(sym(","), expr).parse(input)?;
    let (input, _) = sym(")")(input)?;
    Ok((
        input,
        Expr::InList {
            expr: Box::new(left),
            list,
            negated,
        },
    ))
}

fn comparison_op(input: &str) -> Res<'_, BinaryOperator> {
    let (input, _) = ws(input)?;
    alt((
        value(BinaryOperator::LtEq, tag("<=")),
        value(BinaryOperator::GtEq, tag(">=")),
        value(BinaryOperator::NotEq, tag("<>")),
        value(BinaryOperator::NotEq, tag("!=")),
        value(BinaryOperator::NotRegexIMatch, tag("!~*")),
        value(BinaryOperator::NotRegexMatch, tag("!~")),
        value(BinaryOperator::RegexIMatch, tag("~*")),
        value(BinaryOperator::RegexMatch, tag("~")),
        value(BinaryOperator::Eq, tag("=")),
        value(BinaryOperator::Lt, tag("<")),
        value(BinaryOperator::Gt, tag(">")),
    ))
    .parse(input)
}

fn concat_expr(input: &str) -> Res<'_, Expr> {
    let (input, first) = additive_expr(input)?;
    let (input, rest) = many0((
        value(BinaryOperator::StringConcat, sym("||")),
        additive_expr,
    ))
    .parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn additive_expr(input: &str) -> Res<'_, Expr> {
    let (input, first) = multiplicative_expr(input)?;
    let (input, rest) = many0((
        alt((
            value(BinaryOperator::Plus, sym("+")),
            value(BinaryOperator::Minus, sym("-")),
        )),
        multiplicative_expr,
    ))
    .parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn multiplicative_expr(input: &str) -> Res<'_, Expr> {
    let (input, first) = unary_expr(input)?;
    let (input, rest) = many0((
        alt((
            value(BinaryOperator::Multiply, sym("*")),
            value(BinaryOperator::Divide, sym("/")),
            value(BinaryOperator::Modulo, sym("%")),
        )),
        unary_expr,
    ))
    .parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn unary_expr(input: &str) -> Res<'_, Expr> {
    let sign = alt((
        value(UnaryOperator::Minus, sym("-")),
        value(UnaryOperator::Plus, sym("+")),
    ))
    .parse(input);
    if let Ok((rest, op)) = sign {
        let (rest, operand) = unary_expr(rest)?;
        return Ok((rest, Expr::unary(op, operand)));
    }
    postfix_expr(input)
}

fn postfix_expr(input: &str) -> Res<'_, Expr> {
    let (input, first) = primary(input)?;
    let (input, casts) = many0(preceded(sym("::"), data_type)).parse(input)?;
    let expr = casts.into_iter().fold(first, |expr, data_type| Expr::TypeCast {
        expr: Box::new(expr),
        data_type,
    });
    Ok((input, expr))
}

fn primary(input: &str) -> Res<'_, Expr> {
    let (input, _) = ws(input)?;
    alt((
        parenthesized,
        case_expr,
        cast_expr,
        extract_expr,
        interval_literal,
        map(literal, Expr::Literal),
        function_or_column,
    ))
    .parse(input)
}

fn parenthesized(input: &str) -> Res<'_, Expr> {
    let (input, _) = char('(')(input)?;
    let (input, inner) = alt((
        map(query, |query| Expr::Subquery(Box::new(query))),
        map(expr, |e| Expr::Nested(Box::new(e))),
    ))
    .parse(input)?;
    let (input, _) = sym(")")(input)?;
    Ok((input, inner))
}

fn case_expr(input: &str) -> Res<'_, Expr> {
    let (input, _) = keyword("CASE")(input)?;
    let (input, operand) = opt(expr).parse(input)?;
    let (input, branches) = many1(map(
        (preceded(keyword("WHEN"), expr), preceded(keyword("THEN"), expr)),
        |(condition, result)| WhenClause { condition, result },
    ))
    .parse(input)?;
    let (input, else_result) = opt(preceded(keyword("ELSE"), expr)).parse(input)?;
    let (input, _) = keyword("END")(input)?;
    Ok((
        input,
        Expr::Case {
            operand: operand.map(Box::new),
            branches,
            else_result: else_result.map(Box::new),
        },
    ))
}

fn cast_expr(input: &str) -> Res<'_, Expr> {
    let (input, _) = keyword("CAST")(input)?;
    let (input, _) = sym("(")(input)?;
    let (input, inner) = expr(input)?;
    let (input, _) = keyword("AS")(input)?;
    let (input, data_type) = data_type(input)?;
    let (input, _) = sym(")")(input)?;
    Ok((
        input,
        Expr::Cast {
            expr: Box::new(inner),
            data_type,
        },
    ))
}

fn extract_expr(input: &str) -> Res<'_, Expr> {
    let (input, _) = keyword("EXTRACT")(input)?;
    let (input, _) = sym("(")(input)?;
    let (input, _) = ws(input)?;
    let (input, field) = alt((
        recognize((char('\''), take_while(|c: char| c != '\''), char('\''))),
        recognize((
            satisfy(|c: char| c.is_alphabetic() || c == '_'),
            take_while(is_ident_char),
        )),
    ))
    .parse(input)?;
    let (input, _) = keyword("FROM")(input)?;
    let (input, inner) = expr(input)?;
    let (input, _) = sym(")")(input)?;
    Ok((
        input,
        Expr::Extract {
            field: field.to_string(),
            expr: Box::new(inner),
        },
    ))
}

fn interval_literal(input: &str) -> Res<'_, Expr> {
    let (input, _) = keyword("INTERVAL")(input)?;
    let (input, _) = ws(input)?;
    let (input, text) = string_literal(input)?;
    Ok((input, Expr::Literal(Literal::Interval(text))))
}

fn literal(input: &str) -> Res<'_, Literal> {
    alt((
        map(string_literal, Literal::String),
        map(number_literal, |n: &str| Literal::Number(n.to_string())),
        value(Literal::Boolean(true), keyword("TRUE")),
        value(Literal::Boolean(false), keyword("FALSE")),
        value(Literal::Null, keyword("NULL")),
    ))
    .parse(input)
}

/// A single-quoted string; a doubled quote stands for one quote character.
fn string_literal(input: &str) -> Res<'_, String> {
    let (mut input, _) = char('\'')(input)?;
    let mut text = String::new();
    loop {
        let (rest, chunk) = take_while(|c: char| c != '\'')(input)?;
        text.push_str(chunk);
        let (rest, _) = char('\'')(rest)?;
        match rest.strip_prefix('\'') {
            Some(after) => {
                text.push('\'');
                input = after;
            }
            None => return Ok((rest, text)),
        }
    }
}

fn number_literal(input: &str) -> Res<'_, &str> {
    let exponent = (one_of("eE"), opt(one_of("+-")), digit1);
    let (rest, number) = recognize((
        alt((
            recognize((digit1, opt((char('.'), digit0)))),
            recognize((char('.'), digit1)),
        )),
        opt(exponent),
    ))
    .parse(input)?;
    if rest.starts_with(is_ident_char) {
        return Err(error_at(input));
    }
    Ok((rest, number))
}

fn function_or_column(input: &str) -> Res<'_, Expr> {
    let (input, first) = ident(input)?;
    let (input, rest) = many0(preceded(char('.'), ident)).parse(input)?;
    let mut parts = Vec::with_capacity(rest.len() + 1);
    parts.push(first);
    parts.extend(rest);

    if let Ok((after, _)) = sym("(")(input) {
        let (after, distinct) = opt(keyword("DISTINCT")).parse(after)?;
        let (after, args) = alt((
            map(sym("*"), |_| vec![FunctionArg::Wildcard]),
            separated_list0(sym(","), map(expr, FunctionArg::Expr)),
        ))
        .parse(after)?;
        let (after, _) = sym(")")(after)?;
        let (after, over) = opt(preceded(keyword("OVER"), window_spec)).parse(after)?;
        return Ok((
            after,
            Expr::Function(Function {
                name: ObjectName(parts),
                distinct: distinct.is_some(),
                args,
                over,
            }),
        ));
    }

    let expr = if parts.len() == 1 {
        Expr::Identifier(parts.remove(0))
    } else {
        Expr::CompoundIdentifier(parts)
    };
    Ok((input, expr))
}

// ============================================================================
// Window functions
// ============================================================================

fn window_spec(input: &str) -> Res<'_, WindowSpec> {
    let (input, _) = sym("(")(input)?;
    let (input, partition_by) = opt(preceded(
        (keyword("PARTITION"), keyword("BY")),
        separated_list1(sym(","), expr),
    ))
    .parse(input)?;
    let (input, order_by) = opt(preceded(
        (keyword("ORDER"), keyword("BY")),
        separated_list1(sym(","), order_by_expr),
    ))
    .parse(input)?;
    let (input, frame) = opt(window_frame).parse(input)?;
    let (input, _) = sym(")")(input)?;
    Ok((
        input,
        WindowSpec {
            partition_by: partition_by.unwrap_or_default(),
            order_by: order_by.unwrap_or_default(),
            frame,
        },
    ))
}

fn window_frame(input: &str) -> Res<'_, WindowFrame> {
    let (input, units) = alt((
        value(FrameUnits::Rows, keyword("ROWS")),
        value(FrameUnits::Range, keyword("RANGE")),
        value(FrameUnits::Groups, keyword("GROUPS")),
    ))
    .parse(input)?;

    if let Ok((rest, _)) = keyword("BETWEEN")(input) {
        let (rest, start) = frame_bound(rest)?;
        let (rest, _) = keyword("AND")(rest)?;
        let (rest, end) = frame_bound(rest)?;
        return Ok((
            rest,
            WindowFrame {
                units,
                start,
                end: Some(end),
            },
        ));
    }

    let (input, start) = frame_bound(input)?;
    Ok((
        input,
        WindowFrame {
            units,
            start,
            end: None,
        },
    ))
}

fn frame_bound(input: &str) -> Res<'_, FrameBound> {
    alt((
        value(FrameBound::CurrentRow, (keyword("CURRENT"), keyword("ROW"))),
        value(
            FrameBound::Preceding(None),
            (keyword("UNBOUNDED"), keyword("PRECEDING")),
        ),
        value(
            FrameBound::Following(None),
            (keyword("UNBOUNDED"), keyword("FOLLOWING")),
        ),
        map((concat_expr, keyword("PRECEDING")), |(offset, _)| {
            FrameBound::Preceding(Some(Box::new(offset)))
        }),
        map((concat_expr, keyword("FOLLOWING")), |(offset, _)| {
            FrameBound::Following(Some(Box::new(offset)))
        }),
    ))
    .parse(input)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(sql: &str) -> String {
        parse_statement(sql).unwrap().to_string()
    }

    fn select(sql: &str) -> Select {
        parse_statement(sql).unwrap().select().unwrap().clone()
    }

    #[test]
    fn test_parse_simple_select() {
        let query = parse_statement("SELECT * FROM logs").unwrap();
        assert!(query.limit.is_none());
        assert!(query.with.is_none());
        let select = query.select().unwrap();
        assert_eq!(select.projection, vec![SelectItem::Wildcard]);
        assert_eq!(select.from.len(), 1);
        assert!(select.selection.is_none());
    }

    #[test]
    fn test_parse_case_insensitive_keywords() {
        assert_eq!(
            roundtrip("select * from default where level = 'error'"),
            "SELECT * FROM default WHERE level = 'error'"
        );
    }

    #[test]
    fn test_parse_trailing_semicolon() {
        assert_eq!(roundtrip("SELECT * FROM logs;"), "SELECT * FROM logs");
    }

    #[test]
    fn test_parse_empty_query() {
        assert_eq!(parse_statement("   "), Err(ParseError::EmptyQuery));
        assert_eq!(parse_statement(";"), Err(ParseError::EmptyQuery));
    }

    #[test]
    fn test_parse_rejects_non_select() {
        let err = parse_statement("DELETE FROM logs").unwrap_err();
        assert_eq!(err, ParseError::UnsupportedStatement("DELETE".to_string()));
    }

    #[test]
    fn test_parse_rejects_trailing_content() {
        let err = parse_statement("SELECT * FROM logs WHERE").unwrap_err();
        assert!(matches!(err, ParseError::SyntaxError(_)));

        let err = parse_statement("SELECT * FROM logs )").unwrap_err();
        assert!(matches!(err, ParseError::SyntaxError(_)));
    }

    #[test]
    fn test_parse_select_items_keep_source_text() {
        let select =
            select("SELECT histogram(_timestamp, '1 minute') AS t, count( * ) FROM logs");
        match &select.projection[0] {
            SelectItem::Expr { alias, text, .. } => {
                assert_eq!(alias.as_ref().map(|a| a.value.as_str()), Some("t"));
                assert_eq!(text, "histogram(_timestamp, '1 minute')");
            }
            other => panic!("Expected expression item, got {other:?}"),
        }
        match &select.projection[1] {
            SelectItem::Expr { alias, text, .. } => {
                assert!(alias.is_none());
                assert_eq!(text, "count( * )");
            }
            other => panic!("Expected expression item, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_alias_without_as() {
        let select = select("SELECT count(*) total FROM logs");
        match &select.projection[0] {
            SelectItem::Expr { alias, .. } => {
                assert_eq!(alias.as_ref().map(|a| a.value.as_str()), Some("total"));
            }
            other => panic!("Expected expression item, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_qualified_wildcard() {
        let select = select("SELECT t.* FROM logs t");
        assert_eq!(
            select.projection,
            vec![SelectItem::QualifiedWildcard(ObjectName(vec![Ident::new(
                "t"
            )]))]
        );
    }

    #[test]
    fn test_parse_comparison_operators() {
        let operators = vec![
            ("=", "="),
            ("!=", "<>"),
            ("<>", "<>"),
            ("<", "<"),
            ("<=", "<="),
            (">", ">"),
            (">=", ">="),
            ("~", "~"),
            ("~*", "~*"),
            ("!~", "!~"),
            ("!~*", "!~*"),
        ];

        for (op_str, expected) in operators {
            let sql = format!("SELECT * FROM logs WHERE code {op_str} 10");
            assert_eq!(
                roundtrip(&sql),
                format!("SELECT * FROM logs WHERE code {expected} 10"),
                "Failed for operator {op_str}"
            );
        }
    }

    #[test]
    fn test_parse_and_binds_tighter_than_or() {
        let select = select("SELECT * FROM logs WHERE a = 1 OR b = 2 AND c = 3");
        match select.selection {
            Some(Expr::BinaryOp { op, .. }) => assert_eq!(op, BinaryOperator::Or),
            other => panic!("Expected OR at the root, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_predicates_roundtrip() {
        let sql = "SELECT * FROM logs WHERE a IS NOT NULL AND b NOT IN (1, 2) \
                   AND c BETWEEN 1 AND 5 AND d ILIKE '%x%' AND NOT e = 'y'";
        assert_eq!(
            roundtrip(sql),
            "SELECT * FROM logs WHERE a IS NOT NULL AND b NOT IN (1, 2) \
             AND c BETWEEN 1 AND 5 AND d ILIKE '%x%' AND NOT e = 'y'"
        );
    }

    #[test]
    fn test_parse_full_statement_roundtrip() {
        let sql = "SELECT DISTINCT level, count(*) AS c FROM logs AS l \
                   LEFT JOIN meta m ON l.id = m.id WHERE code >= 500 \
                   GROUP BY level HAVING count(*) > 1 ORDER BY c DESC NULLS LAST \
                   LIMIT 10 OFFSET 5";
        assert_eq!(
            roundtrip(sql),
            "SELECT DISTINCT level, count(*) AS c FROM logs AS l \
             LEFT JOIN meta AS m ON l.id = m.id WHERE code >= 500 \
             GROUP BY level HAVING count(*) > 1 ORDER BY c DESC NULLS LAST \
             LIMIT 10 OFFSET 5"
        );
    }

    #[test]
    fn test_parse_backtick_and_double_quoted_identifiers() {
        assert_eq!(
            roundtrip("SELECT `service`, \"Host\" FROM `default` WHERE `level` = 'error'"),
            "SELECT service, \"Host\" FROM default WHERE level = 'error'"
        );
    }

    #[test]
    fn test_parse_string_with_doubled_quote() {
        let select = select("SELECT * FROM logs WHERE msg = 'it''s'");
        match select.selection {
            Some(Expr::BinaryOp { right, .. }) => {
                assert_eq!(*right, Expr::Literal(Literal::String("it's".to_string())));
            }
            other => panic!("Expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_case_cast_and_interval() {
        let sql = "SELECT CASE WHEN code >= 500 THEN 'error' ELSE 'ok' END AS status, \
                   CAST(code AS BIGINT), code::VARCHAR FROM logs \
                   WHERE _timestamp > now() - INTERVAL '1 hour'";
        assert_eq!(
            roundtrip(sql),
            "SELECT CASE WHEN code >= 500 THEN 'error' ELSE 'ok' END AS status, \
             CAST(code AS BIGINT), code::VARCHAR FROM logs \
             WHERE _timestamp > now() - INTERVAL '1 hour'"
        );
    }

    #[test]
    fn test_parse_subqueries() {
        let sql = "SELECT * FROM (SELECT * FROM logs WHERE a = 1) AS sub \
                   WHERE b IN (SELECT b FROM other)";
        assert_eq!(
            roundtrip(sql),
            "SELECT * FROM (SELECT * FROM logs WHERE a = 1) AS sub \
             WHERE b IN (SELECT b FROM other)"
        );
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(
            roundtrip("SELECT * FROM logs WHERE a = -42 AND b = 3.5 AND c = 1e3"),
            "SELECT * FROM logs WHERE a = -42 AND b = 3.5 AND c = 1e3"
        );
    }

    #[test]
    fn test_parse_nested_parentheses_kept() {
        assert_eq!(
            roundtrip("SELECT * FROM logs WHERE (a = 1 OR b = 2) AND c = 3"),
            "SELECT * FROM logs WHERE (a = 1 OR b = 2) AND c = 3"
        );
    }

    #[test]
    fn test_parse_comments() {
        assert_eq!(
            roundtrip("SELECT * FROM logs -- recent errors"),
            "SELECT * FROM logs"
        );
        assert_eq!(
            roundtrip("/* dashboard */ SELECT a, -- first\n b FROM logs; -- done"),
            "SELECT a, b FROM logs"
        );
        assert_eq!(roundtrip("SELECT '--' AS dashes"), "SELECT '--' AS dashes");
        assert_eq!(parse_statement("-- nothing"), Err(ParseError::EmptyQuery));
    }

    #[test]
    fn test_parse_with_clause() {
        let query = parse_statement("WITH x AS (SELECT * FROM logs) SELECT * FROM x").unwrap();
        let with = query.with.as_ref().unwrap();
        assert_eq!(with.ctes.len(), 1);
        assert_eq!(with.ctes[0].alias, Ident::new("x"));
        assert_eq!(
            query.to_string(),
            "WITH x AS (SELECT * FROM logs) SELECT * FROM x"
        );

        assert_eq!(
            roundtrip(
                "with recursive e (host, n) as (select host, count(*) from logs group by host), \
                 f as (select 1) select * from e order by n desc limit 3"
            ),
            "WITH RECURSIVE e (host, n) AS (SELECT host, count(*) FROM logs GROUP BY host), \
             f AS (SELECT 1) SELECT * FROM e ORDER BY n DESC LIMIT 3"
        );
    }

    #[test]
    fn test_parse_window_functions() {
        assert_eq!(
            roundtrip("SELECT level, row_number() OVER (PARTITION BY level) AS rn FROM logs"),
            "SELECT level, row_number() OVER (PARTITION BY level) AS rn FROM logs"
        );
        assert_eq!(
            roundtrip(
                "SELECT sum(bytes) over (order by _timestamp rows between 5 preceding \
                 and current row) FROM logs"
            ),
            "SELECT sum(bytes) OVER (ORDER BY _timestamp ROWS BETWEEN 5 PRECEDING \
             AND CURRENT ROW) FROM logs"
        );
        assert_eq!(
            roundtrip("SELECT count(*) OVER () FROM logs"),
            "SELECT count(*) OVER () FROM logs"
        );
    }

    #[test]
    fn test_parse_extract() {
        let select = select("SELECT extract(hour FROM now()) AS h FROM logs");
        match &select.projection[0] {
            SelectItem::Expr { expr, alias, .. } => {
                assert!(matches!(expr, Expr::Extract { field, .. } if field == "hour"));
                assert_eq!(alias.as_ref().map(|a| a.value.as_str()), Some("h"));
            }
            other => panic!("Expected expression item, got {other:?}"),
        }
        assert_eq!(
            roundtrip("SELECT extract(hour FROM now()) AS h FROM logs"),
            "SELECT EXTRACT(hour FROM now()) AS h FROM logs"
        );
    }

    #[test]
    fn test_parse_set_operations() {
        let query = parse_statement("SELECT a FROM logs UNION ALL SELECT a FROM other").unwrap();
        assert!(matches!(
            query.body,
            SetExpr::SetOperation {
                op: SetOperator::Union,
                quantifier: SetQuantifier::All,
                ..
            }
        ));
        assert_eq!(
            query.to_string(),
            "SELECT a FROM logs UNION ALL SELECT a FROM other"
        );

        let query = parse_statement(
            "SELECT a FROM x UNION SELECT a FROM y INTERSECT SELECT a FROM z ORDER BY a LIMIT 5",
        )
        .unwrap();
        assert!(query.limit.is_some());
        assert_eq!(query.order_by.len(), 1);
        match &query.body {
            SetExpr::SetOperation { op, right, .. } => {
                assert_eq!(*op, SetOperator::Union);
                assert!(matches!(
                    **right,
                    SetExpr::SetOperation {
                        op: SetOperator::Intersect,
                        ..
                    }
                ));
            }
            other => panic!("Expected a set operation, got {other:?}"),
        }

        assert_eq!(
            roundtrip("(SELECT a FROM x EXCEPT SELECT a FROM y) INTERSECT SELECT a FROM z"),
            "(SELECT a FROM x EXCEPT SELECT a FROM y) INTERSECT SELECT a FROM z"
        );
    }

    #[test]
    fn test_parse_nested_signs_roundtrip() {
        let sql = roundtrip("SELECT * FROM logs WHERE code = - -1 AND b = 2");
        assert_eq!(sql, "SELECT * FROM logs WHERE code = - -1 AND b = 2");
        assert_eq!(roundtrip(&sql), sql);
    }
}
