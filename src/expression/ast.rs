use std::fmt;

/// A literal value appearing in an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Null => write!(f, "null"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,

    // Comparison
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    In,
    NotIn,

    // Logical
    And,
    Or,
    Coalesce,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "^",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Coalesce => "??",
        }
    }

    /// Precedence level of the operator. Higher numbers bind more tightly.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Coalesce => 2,
            BinaryOp::Or => 3,
            BinaryOp::And => 4,
            BinaryOp::Equal | BinaryOp::NotEqual => 5,
            BinaryOp::Less
            | BinaryOp::LessOrEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterOrEqual
            | BinaryOp::In
            | BinaryOp::NotIn => 6,
            BinaryOp::Add | BinaryOp::Subtract => 7,
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => 8,
            BinaryOp::Power => 9,
        }
    }
}

/// The syntax tree of a single expression, as written in expression rows,
/// decision table cells and mapping fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    /// A variable of the input context, including `$`.
    Identifier(String),
    /// `#`, the current item inside a closure argument such as `map(xs, #.a)`.
    Pointer,
    Member(Box<Expression>, String),
    Index(Box<Expression>, Box<Expression>),
    Array(Vec<Expression>),
    Object(Vec<(String, Expression)>),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
    Call(String, Vec<Expression>),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Start the recursive formatting with the lowest parent precedence.
        self.fmt_with_precedence(f, 0)
    }
}

impl Expression {
    /// Gets the precedence level for an expression type. Higher numbers bind more tightly.
    fn precedence(&self) -> u8 {
        match self {
            Expression::Conditional(..) => 1,
            Expression::Binary(op, _, _) => op.precedence(),
            Expression::Unary(..) => 10,
            Expression::Member(..) | Expression::Index(..) | Expression::Call(..) => 11,
            Expression::Literal(_)
            | Expression::Identifier(_)
            | Expression::Pointer
            | Expression::Array(_)
            | Expression::Object(_) => 12,
        }
    }

    /// Recursively formats the expression, adding parentheses only when necessary.
    fn fmt_with_precedence(&self, f: &mut fmt::Formatter<'_>, parent_precedence: u8) -> fmt::Result {
        let current_precedence = self.precedence();
        let needs_parens = current_precedence < parent_precedence;

        if needs_parens {
            write!(f, "(")?;
        }

        match self {
            Expression::Literal(v) => write!(f, "{}", v)?,
            Expression::Identifier(name) => write!(f, "{}", name)?,
            Expression::Pointer => write!(f, "#")?,
            Expression::Member(target, name) => {
                target.fmt_with_precedence(f, current_precedence)?;
                write!(f, ".{}", name)?;
            }
            Expression::Index(target, index) => {
                target.fmt_with_precedence(f, current_precedence)?;
                write!(f, "[")?;
                index.fmt_with_precedence(f, 0)?;
                write!(f, "]")?;
            }
            Expression::Array(items) => {
                write!(f, "[")?;
                self.fmt_list(f, items.iter())?;
                write!(f, "]")?;
            }
            Expression::Object(fields) => {
                write!(f, "{{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", key)?;
                    value.fmt_with_precedence(f, 0)?;
                }
                write!(f, "}}")?;
            }
            Expression::Unary(op, operand) => {
                match op {
                    UnaryOp::Negate => write!(f, "-")?,
                    UnaryOp::Not => write!(f, "not ")?,
                }
                operand.fmt_with_precedence(f, current_precedence)?;
            }
            Expression::Binary(op, l, r) => {
                // Power is right-associative, everything else is left-associative.
                let (left_min, right_min) = if *op == BinaryOp::Power {
                    (current_precedence + 1, current_precedence)
                } else {
                    (current_precedence, current_precedence + 1)
                };
                l.fmt_with_precedence(f, left_min)?;
                write!(f, " {} ", op.symbol())?;
                r.fmt_with_precedence(f, right_min)?;
            }
            Expression::Conditional(condition, then, otherwise) => {
                condition.fmt_with_precedence(f, current_precedence + 1)?;
                write!(f, " ? ")?;
                then.fmt_with_precedence(f, 0)?;
                write!(f, " : ")?;
                otherwise.fmt_with_precedence(f, current_precedence)?;
            }
            Expression::Call(name, args) => {
                write!(f, "{}(", name)?;
                self.fmt_list(f, args.iter())?;
                write!(f, ")")?;
            }
        }

        if needs_parens {
            write!(f, ")")?;
        }
        Ok(())
    }

    fn fmt_list<'a>(
        &self,
        f: &mut fmt::Formatter<'_>,
        items: impl Iterator<Item = &'a Expression>,
    ) -> fmt::Result {
        for (i, item) in items.enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            item.fmt_with_precedence(f, 0)?;
        }
        Ok(())
    }
}
