//! Abstract Syntax Tree definitions for the SQL dialect.
//!
//! Every node implements `Display`, which re-serializes the tree as SQL text.
//! Serialization never introduces identifier quoting: identifiers keep the
//! double quotes they were written with, and backtick-quoted identifiers are
//! written bare.

use serde::Serialize;
use std::fmt;

/// An identifier, optionally written with quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ident {
    /// The identifier text without quotes.
    pub value: String,
    /// The quote character used in the source, if any.
    pub quote_style: Option<char>,
}

impl Ident {
    /// Creates an unquoted identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quote_style: None,
        }
    }

    /// Creates an identifier written with the given quote character.
    #[must_use]
    pub fn with_quote(value: impl Into<String>, quote: char) -> Self {
        Self {
            value: value.into(),
            quote_style: Some(quote),
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quote_style {
            Some('"') => write!(f, "\"{}\"", self.value),
            _ => write!(f, "{}", self.value),
        }
    }
}

/// A possibly qualified name such as `db.stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectName(pub Vec<Ident>);

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_separated(f, &self.0, ".")
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Literal {
    /// Single-quoted string, stored unescaped.
    String(String),
    /// Numeric literal, stored as written.
    Number(String),
    /// `TRUE` / `FALSE`
    Boolean(bool),
    /// `NULL`
    Null,
    /// `INTERVAL '...'`
    Interval(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(true) => write!(f, "TRUE"),
            Self::Boolean(false) => write!(f, "FALSE"),
            Self::Null => write!(f, "NULL"),
            Self::Interval(s) => write!(f, "INTERVAL '{}'", s.replace('\'', "''")),
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOperator {
    /// `NOT`
    Not,
    /// `-`
    Minus,
    /// `+`
    Plus,
}

/// Binary operators, from logical connectives down to arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOperator {
    /// `OR`
    Or,
    /// `AND`
    And,
    /// `=`
    Eq,
    /// `<>` (also parsed from `!=`)
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `~`
    RegexMatch,
    /// `~*`
    RegexIMatch,
    /// `!~`
    NotRegexMatch,
    /// `!~*`
    NotRegexIMatch,
    /// `||`
    StringConcat,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
}

impl BinaryOperator {
    /// Binding strength; higher binds tighter.
    #[must_use]
    pub fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq
            | Self::NotEq
            | Self::Lt
            | Self::LtEq
            | Self::Gt
            | Self::GtEq
            | Self::RegexMatch
            | Self::RegexIMatch
            | Self::NotRegexMatch
            | Self::NotRegexIMatch => 4,
            Self::StringConcat => 5,
            Self::Plus | Self::Minus => 6,
            Self::Multiply | Self::Divide | Self::Modulo => 7,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Or => "OR",
            Self::And => "AND",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::RegexMatch => "~",
            Self::RegexIMatch => "~*",
            Self::NotRegexMatch => "!~",
            Self::NotRegexIMatch => "!~*",
            Self::StringConcat => "||",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
        };
        write!(f, "{symbol}")
    }
}

/// A function call argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FunctionArg {
    /// `*`, as in `count(*)`.
    Wildcard,
    /// Any expression.
    Expr(Expr),
}

impl fmt::Display for FunctionArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => write!(f, "*"),
            Self::Expr(expr) => write!(f, "{expr}"),
        }
    }
}

/// A function call such as `histogram(_timestamp, '1 minute')`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Function {
    /// The function name.
    pub name: ObjectName,
    /// Whether `DISTINCT` precedes the arguments.
    pub distinct: bool,
    /// The arguments.
    pub args: Vec<FunctionArg>,
    /// The `OVER (...)` window of a window function call.
    pub over: Option<WindowSpec>,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        write_separated(f, &self.args, ", ")?;
        write!(f, ")")?;
        if let Some(over) = &self.over {
            write!(f, " OVER ({over})")?;
        }
        Ok(())
    }
}

/// The inside of an `OVER (...)` clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSpec {
    /// `PARTITION BY` expressions.
    pub partition_by: Vec<Expr>,
    /// `ORDER BY` items.
    pub order_by: Vec<OrderByExpr>,
    /// `ROWS` / `RANGE` / `GROUPS` frame.
    pub frame: Option<WindowFrame>,
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut separator = "";
        if !self.partition_by.is_empty() {
            write!(f, "PARTITION BY ")?;
            write_separated(f, &self.partition_by, ", ")?;
            separator = " ";
        }
        if !self.order_by.is_empty() {
            write!(f, "{separator}ORDER BY ")?;
            write_separated(f, &self.order_by, ", ")?;
            separator = " ";
        }
        if let Some(frame) = &self.frame {
            write!(f, "{separator}{frame}")?;
        }
        Ok(())
    }
}

/// Unit of a window frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameUnits {
    /// `ROWS`
    Rows,
    /// `RANGE`
    Range,
    /// `GROUPS`
    Groups,
}

impl fmt::Display for FrameUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows => write!(f, "ROWS"),
            Self::Range => write!(f, "RANGE"),
            Self::Groups => write!(f, "GROUPS"),
        }
    }
}

/// One end of a window frame. `None` offsets mean `UNBOUNDED`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FrameBound {
    /// `CURRENT ROW`
    CurrentRow,
    /// `<offset> PRECEDING` / `UNBOUNDED PRECEDING`
    Preceding(Option<Box<Expr>>),
    /// `<offset> FOLLOWING` / `UNBOUNDED FOLLOWING`
    Following(Option<Box<Expr>>),
}

impl fmt::Display for FrameBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CurrentRow => write!(f, "CURRENT ROW"),
            Self::Preceding(None) => write!(f, "UNBOUNDED PRECEDING"),
            Self::Preceding(Some(offset)) => write!(f, "{offset} PRECEDING"),
            Self::Following(None) => write!(f, "UNBOUNDED FOLLOWING"),
            Self::Following(Some(offset)) => write!(f, "{offset} FOLLOWING"),
        }
    }
}

/// A window frame clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowFrame {
    /// The frame unit.
    pub units: FrameUnits,
    /// The start bound.
    pub start: FrameBound,
    /// The end bound, when written as `BETWEEN start AND end`.
    pub end: Option<FrameBound>,
}

impl fmt::Display for WindowFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.end {
            Some(end) => write!(f, "{} BETWEEN {} AND {end}", self.units, self.start),
            None => write!(f, "{} {}", self.units, self.start),
        }
    }
}

/// A `WHEN ... THEN ...` arm of a `CASE` expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhenClause {
    /// The condition (or the value compared with the operand).
    pub condition: Expr,
    /// The result when the condition holds.
    pub result: Expr,
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// A column reference such as `level`.
    Identifier(Ident),
    /// A qualified column reference such as `t.level`.
    CompoundIdentifier(Vec<Ident>),
    /// A literal value.
    Literal(Literal),
    /// A unary operation.
    UnaryOp {
        /// The operator.
        op: UnaryOperator,
        /// The operand.
        expr: Box<Expr>,
    },
    /// A binary operation.
    BinaryOp {
        /// Left operand.
        left: Box<Expr>,
        /// The operator.
        op: BinaryOperator,
        /// Right operand.
        right: Box<Expr>,
    },
    /// A parenthesised expression, kept so re-serialization matches the source.
    Nested(Box<Expr>),
    /// A function call.
    Function(Function),
    /// `EXTRACT(field FROM expr)`
    Extract {
        /// The date part, as written.
        field: String,
        /// The value the part is taken from.
        expr: Box<Expr>,
    },
    /// `CAST(expr AS type)`
    Cast {
        /// The value being converted.
        expr: Box<Expr>,
        /// The target type, as written.
        data_type: String,
    },
    /// `expr::type`
    TypeCast {
        /// The value being converted.
        expr: Box<Expr>,
        /// The target type, as written.
        data_type: String,
    },
    /// `CASE [operand] WHEN ... THEN ... [ELSE ...] END`
    Case {
        /// Optional operand compared against each arm.
        operand: Option<Box<Expr>>,
        /// The `WHEN` arms.
        branches: Vec<WhenClause>,
        /// Optional `ELSE` result.
        else_result: Option<Box<Expr>>,
    },
    /// `expr [NOT] IN (a, b, ...)`
    InList {
        /// The tested value.
        expr: Box<Expr>,
        /// The candidate values.
        list: Vec<Expr>,
        /// Whether `NOT` was given.
        negated: bool,
    },
    /// `expr [NOT] IN (SELECT ...)`
    InSubquery {
        /// The tested value.
        expr: Box<Expr>,
        /// The subquery.
        subquery: Box<Query>,
        /// Whether `NOT` was given.
        negated: bool,
    },
    /// `expr [NOT] BETWEEN low AND high`
    Between {
        /// The tested value.
        expr: Box<Expr>,
        /// Whether `NOT` was given.
        negated: bool,
        /// Lower bound.
        low: Box<Expr>,
        /// Upper bound.
        high: Box<Expr>,
    },
    /// `expr [NOT] LIKE pattern` / `ILIKE`
    Like {
        /// The tested value.
        expr: Box<Expr>,
        /// Whether `NOT` was given.
        negated: bool,
        /// `ILIKE` instead of `LIKE`.
        case_insensitive: bool,
        /// The pattern.
        pattern: Box<Expr>,
    },
    /// `expr IS [NOT] NULL`
    IsNull {
        /// The tested value.
        expr: Box<Expr>,
        /// Whether `NOT` was given.
        negated: bool,
    },
    /// A scalar subquery `(SELECT ...)`.
    Subquery(Box<Query>),
}

impl Expr {
    /// Builds a binary operation node.
    #[must_use]
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Self::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Builds a unary operation node.
    #[must_use]
    pub fn unary(op: UnaryOperator, expr: Expr) -> Self {
        Self::UnaryOp {
            op,
            expr: Box::new(expr),
        }
    }

    /// Binding strength of the node's outermost operator.
    fn precedence(&self) -> u8 {
        match self {
            Self::BinaryOp { op, .. } => op.precedence(),
            Self::UnaryOp {
                op: UnaryOperator::Not,
                ..
            } => 3,
            Self::InList { .. }
            | Self::InSubquery { .. }
            | Self::Between { .. }
            | Self::Like { .. }
            | Self::IsNull { .. } => 4,
            _ => u8::MAX,
        }
    }

    /// Whether the serialized expression begins with `-` or `+`.
    fn starts_with_sign(&self) -> bool {
        match self {
            Self::UnaryOp {
                op: UnaryOperator::Minus | UnaryOperator::Plus,
                ..
            } => true,
            Self::Literal(Literal::Number(n)) => n.starts_with(['-', '+']),
            _ => false,
        }
    }

    /// Writes `child`, wrapping it in parentheses when it binds looser than `min`.
    fn write_operand(f: &mut fmt::Formatter<'_>, child: &Expr, min: u8) -> fmt::Result {
        if child.precedence() < min {
            write!(f, "({child})")
        } else {
            write!(f, "{child}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(ident) => write!(f, "{ident}"),
            Self::CompoundIdentifier(parts) => write_separated(f, parts, "."),
            Self::Literal(literal) => write!(f, "{literal}"),
            Self::UnaryOp { op, expr } => match op {
                UnaryOperator::Not => {
                    write!(f, "NOT ")?;
                    Self::write_operand(f, expr, 3)
                }
                UnaryOperator::Minus | UnaryOperator::Plus => {
                    let sign = if *op == UnaryOperator::Minus { "-" } else { "+" };
                    // `--` would start a line comment.
                    let space = if expr.starts_with_sign() { " " } else { "" };
                    write!(f, "{sign}{space}")?;
                    Self::write_operand(f, expr, u8::MAX)
                }
            },
            Self::BinaryOp { left, op, right } => {
                let precedence = op.precedence();
                Self::write_operand(f, left, precedence)?;
                write!(f, " {op} ")?;
                Self::write_operand(f, right, precedence + 1)
            }
            Self::Nested(inner) => write!(f, "({inner})"),
            Self::Function(function) => write!(f, "{function}"),
            Self::Extract { field, expr } => write!(f, "EXTRACT({field} FROM {expr})"),
            Self::Cast { expr, data_type } => write!(f, "CAST({expr} AS {data_type})"),
            Self::TypeCast { expr, data_type } => {
                Self::write_operand(f, expr, u8::MAX)?;
                write!(f, "::{data_type}")
            }
            Self::Case {
                operand,
                branches,
                else_result,
            } => {
                write!(f, "CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {operand}")?;
                }
                for branch in branches {
                    write!(f, " WHEN {} THEN {}", branch.condition, branch.result)?;
                }
                if let Some(else_result) = else_result {
                    write!(f, " ELSE {else_result}")?;
                }
                write!(f, " END")
            }
            Self::InList {
                expr,
                list,
                negated,
            } => {
                Self::write_operand(f, expr, 5)?;
                write!(f, " {}IN (", not_prefix(*negated))?;
                write_separated(f, list, ", ")?;
                write!(f, ")")
            }
            Self::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                Self::write_operand(f, expr, 5)?;
                write!(f, " {}IN ({subquery})", not_prefix(*negated))
            }
            Self::Between {
                expr,
                negated,
                low,
                high,
            } => {
                Self::write_operand(f, expr, 5)?;
                write!(f, " {}BETWEEN ", not_prefix(*negated))?;
                Self::write_operand(f, low, 5)?;
                write!(f, " AND ")?;
                Self::write_operand(f, high, 5)
            }
            Self::Like {
                expr,
                negated,
                case_insensitive,
                pattern,
            } => {
                Self::write_operand(f, expr, 5)?;
                let keyword = if *case_insensitive { "ILIKE" } else { "LIKE" };
                write!(f, " {}{keyword} ", not_prefix(*negated))?;
                Self::write_operand(f, pattern, 5)
            }
            Self::IsNull { expr, negated } => {
                Self::write_operand(f, expr, 5)?;
                write!(f, " IS {}NULL", not_prefix(*negated))
            }
            Self::Subquery(select) => write!(f, "({select})"),
        }
    }
}

/// One entry of the select list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    /// `t.*`
    QualifiedWildcard(ObjectName),
    /// An expression with an optional alias.
    Expr {
        /// The expression.
        expr: Expr,
        /// The alias, if any.
        alias: Option<Ident>,
        /// The expression exactly as it appeared in the source text.
        text: String,
    },
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => write!(f, "*"),
            Self::QualifiedWildcard(name) => write!(f, "{name}.*"),
            Self::Expr { expr, alias, .. } => {
                write!(f, "{expr}")?;
                if let Some(alias) = alias {
                    write!(f, " AS {alias}")?;
                }
                Ok(())
            }
        }
    }
}

/// A table, or a derived table, in the `FROM` clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TableFactor {
    /// A named table (an OpenObserve stream).
    Table {
        /// The table name.
        name: ObjectName,
        /// Optional alias.
        alias: Option<Ident>,
    },
    /// `(SELECT ...) [AS] alias`
    Derived {
        /// The subquery.
        subquery: Box<Query>,
        /// Optional alias.
        alias: Option<Ident>,
    },
}

impl fmt::Display for TableFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alias = match self {
            Self::Table { name, alias } => {
                write!(f, "{name}")?;
                alias
            }
            Self::Derived { subquery, alias } => {
                write!(f, "({subquery})")?;
                alias
            }
        };
        if let Some(alias) = alias {
            write!(f, " AS {alias}")?;
        }
        Ok(())
    }
}

/// Join flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JoinOperator {
    /// `JOIN` / `INNER JOIN`
    Inner,
    /// `LEFT [OUTER] JOIN`
    LeftOuter,
    /// `RIGHT [OUTER] JOIN`
    RightOuter,
    /// `FULL [OUTER] JOIN`
    FullOuter,
    /// `CROSS JOIN`
    Cross,
}

impl fmt::Display for JoinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "JOIN"),
            Self::LeftOuter => write!(f, "LEFT JOIN"),
            Self::RightOuter => write!(f, "RIGHT JOIN"),
            Self::FullOuter => write!(f, "FULL JOIN"),
            Self::Cross => write!(f, "CROSS JOIN"),
        }
    }
}

/// A join onto the preceding relation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Join {
    /// The join flavour.
    pub operator: JoinOperator,
    /// The joined relation.
    pub relation: TableFactor,
    /// The `ON` condition.
    pub constraint: Option<Expr>,
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator, self.relation)?;
        if let Some(constraint) = &self.constraint {
            write!(f, " ON {constraint}")?;
        }
        Ok(())
    }
}

/// A relation followed by its joins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableWithJoins {
    /// The leading relation.
    pub relation: TableFactor,
    /// Joins applied in order.
    pub joins: Vec<Join>,
}

impl fmt::Display for TableWithJoins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.relation)?;
        for join in &self.joins {
            write!(f, " {join}")?;
        }
        Ok(())
    }
}

/// Sort order for ORDER BY items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortOrder {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "ASC"),
            Self::Desc => write!(f, "DESC"),
        }
    }
}

/// One ORDER BY item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderByExpr {
    /// The sort key.
    pub expr: Expr,
    /// Explicit direction, if written.
    pub order: Option<SortOrder>,
    /// `NULLS FIRST` (true) / `NULLS LAST` (false), if written.
    pub nulls_first: Option<bool>,
}

impl fmt::Display for OrderByExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(order) = self.order {
            write!(f, " {order}")?;
        }
        match self.nulls_first {
            Some(true) => write!(f, " NULLS FIRST"),
            Some(false) => write!(f, " NULLS LAST"),
            None => Ok(()),
        }
    }
}

/// One `SELECT ... FROM ... WHERE ... GROUP BY ... HAVING ...` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Select {
    /// `SELECT DISTINCT`
    pub distinct: bool,
    /// The select list.
    pub projection: Vec<SelectItem>,
    /// The FROM clause (empty when absent).
    pub from: Vec<TableWithJoins>,
    /// The WHERE clause.
    pub selection: Option<Expr>,
    /// The GROUP BY expressions.
    pub group_by: Vec<Expr>,
    /// The HAVING clause.
    pub having: Option<Expr>,
}

impl Select {
    /// ANDs `condition` onto the WHERE clause, or makes it the WHERE clause
    /// when there is none.
    pub fn and_where(&mut self, condition: Expr) {
        self.selection = Some(match self.selection.take() {
            Some(existing) => Expr::binary(existing, BinaryOperator::And, condition),
            None => condition,
        });
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        write_separated(f, &self.projection, ", ")?;

        if !self.from.is_empty() {
            write!(f, " FROM ")?;
            write_separated(f, &self.from, ", ")?;
        }

        if let Some(ref selection) = self.selection {
            write!(f, " WHERE {selection}")?;
        }

        if !self.group_by.is_empty() {
            write!(f, " GROUP BY ")?;
            write_separated(f, &self.group_by, ", ")?;
        }

        if let Some(ref having) = self.having {
            write!(f, " HAVING {having}")?;
        }

        Ok(())
    }
}

/// `UNION`, `EXCEPT` or `INTERSECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SetOperator {
    /// `UNION`
    Union,
    /// `EXCEPT`
    Except,
    /// `INTERSECT`
    Intersect,
}

impl fmt::Display for SetOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Union => write!(f, "UNION"),
            Self::Except => write!(f, "EXCEPT"),
            Self::Intersect => write!(f, "INTERSECT"),
        }
    }
}

/// `ALL` or `DISTINCT` after a set operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SetQuantifier {
    /// Nothing written.
    #[default]
    None,
    /// `ALL`
    All,
    /// `DISTINCT`
    Distinct,
}

/// The body of a query: a SELECT block or a combination of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SetExpr {
    /// A single SELECT block.
    Select(Box<Select>),
    /// A parenthesised query.
    Query(Box<Query>),
    /// `left UNION [ALL] right` and friends.
    SetOperation {
        /// Left operand.
        left: Box<SetExpr>,
        /// The operator.
        op: SetOperator,
        /// `ALL` / `DISTINCT`
        quantifier: SetQuantifier,
        /// Right operand.
        right: Box<SetExpr>,
    },
}

impl SetExpr {
    /// The SELECT block that names the result columns: the leftmost one.
    #[must_use]
    pub fn leftmost_select(&self) -> &Select {
        match self {
            Self::Select(select) => select,
            Self::Query(query) => query.body.leftmost_select(),
            Self::SetOperation { left, .. } => left.leftmost_select(),
        }
    }

    /// Every SELECT block of the body, left to right. Parenthesised queries
    /// are entered; subqueries and CTEs are not.
    #[must_use]
    pub fn selects(&self) -> Vec<&Select> {
        match self {
            Self::Select(select) => vec![select],
            Self::Query(query) => query.body.selects(),
            Self::SetOperation { left, right, .. } => {
                let mut selects = left.selects();
                selects.extend(right.selects());
                selects
            }
        }
    }
}

impl fmt::Display for SetExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(select) => write!(f, "{select}"),
            Self::Query(query) => write!(f, "({query})"),
            Self::SetOperation {
                left,
                op,
                quantifier,
                right,
            } => {
                write!(f, "{left} {op}")?;
                match quantifier {
                    SetQuantifier::None => {}
                    SetQuantifier::All => write!(f, " ALL")?,
                    SetQuantifier::Distinct => write!(f, " DISTINCT")?,
                }
                write!(f, " {right}")
            }
        }
    }
}

/// A common table expression, `name [(columns)] AS (query)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cte {
    /// The name the query is bound to.
    pub alias: Ident,
    /// Optional column names.
    pub columns: Vec<Ident>,
    /// The bound query.
    pub query: Box<Query>,
}

impl fmt::Display for Cte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.alias)?;
        if !self.columns.is_empty() {
            write!(f, " (")?;
            write_separated(f, &self.columns, ", ")?;
            write!(f, ")")?;
        }
        write!(f, " AS ({})", self.query)
    }
}

/// A `WITH` clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct With {
    /// `WITH RECURSIVE`
    pub recursive: bool,
    /// The bound queries, in order.
    pub ctes: Vec<Cte>,
}

impl fmt::Display for With {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WITH ")?;
        if self.recursive {
            write!(f, "RECURSIVE ")?;
        }
        write_separated(f, &self.ctes, ", ")
    }
}

/// A complete query statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    /// The `WITH` clause.
    pub with: Option<With>,
    /// The SELECT block or set operation.
    pub body: SetExpr,
    /// The ORDER BY items.
    pub order_by: Vec<OrderByExpr>,
    /// The LIMIT row count, as written.
    pub limit: Option<Expr>,
    /// The OFFSET row count, as written.
    pub offset: Option<Expr>,
}

impl Query {
    /// Wraps a single SELECT block.
    #[must_use]
    pub fn from_select(select: Select) -> Self {
        Self {
            with: None,
            body: SetExpr::Select(Box::new(select)),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// The body's SELECT block, when the body is not a set operation.
    #[must_use]
    pub fn select(&self) -> Option<&Select> {
        match &self.body {
            SetExpr::Select(select) => Some(select),
            _ => None,
        }
    }

    /// Mutable access to the body's SELECT block, when the body is not a
    /// set operation.
    pub fn select_mut(&mut self) -> Option<&mut Select> {
        match &mut self.body {
            SetExpr::Select(select) => Some(select),
            _ => None,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(with) = &self.with {
            write!(f, "{with} ")?;
        }
        write!(f, "{}", self.body)?;

        if !self.order_by.is_empty() {
            write!(f, " ORDER BY ")?;
            write_separated(f, &self.order_by, ", ")?;
        }

        if let Some(ref limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }

        if let Some(ref offset) = self.offset {
            write!(f, " OFFSET {offset}")?;
        }

        Ok(())
    }
}

fn not_prefix(negated: bool) -> &'static str {
    if negated {
        "NOT "
    } else {
        ""
    }
}

fn write_separated<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    separator: &str,
) -> fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            write!(f, "{separator}")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}
