//! Algebraic rewrites applied to an expression tree before graph construction.
//!
//! Rewriting is bottom-up over `Then`, `Or`, `OneOrMore`, `ZeroOrMore` and
//! `ZeroOrOne`; atoms are fixed points and `And` subtrees are left as parsed.
//! Operand comparisons are structural.

use crate::expr::Expr;

/// Rewrite nested operator patterns into their canonical form.
pub fn simplify(expr: &Expr) -> Expr {
    match expr {
        Expr::Or(operands) => {
            let mut operands: Vec<Expr> = operands.iter().map(simplify).collect();
            if operands.len() == 2 {
                let second = operands.pop();
                let first = operands.pop();
                if let (Some(first), Some(second)) = (first, second) {
                    return simplify_or(first, second);
                }
            }
            Expr::Or(operands)
        }
        Expr::Then(first, second) => simplify_then(simplify(first), simplify(second)),
        Expr::OneOrMore(inner) => simplify_one_or_more(simplify(inner)),
        Expr::ZeroOrMore(inner) => simplify_zero_or_more(simplify(inner)),
        Expr::ZeroOrOne(inner) => simplify_zero_or_one(simplify(inner)),
        Expr::ZeroOrMoreProvisional(inner) => Expr::ZeroOrMoreProvisional(Box::new(simplify(inner))),
        Expr::ZeroOrOneProvisional(inner) => Expr::ZeroOrOneProvisional(Box::new(simplify(inner))),
        Expr::Atom(_) | Expr::And(_) => expr.clone(),
    }
}

/// Relabel every `ZeroOrMore`/`ZeroOrOne` into its part-document export variant.
pub fn to_provisional_form(expr: &Expr) -> Expr {
    let boxed = |inner: &Expr| Box::new(to_provisional_form(inner));
    match expr {
        Expr::Atom(_) => expr.clone(),
        Expr::Then(a, b) => Expr::Then(boxed(a), boxed(b)),
        Expr::Or(operands) => Expr::Or(operands.iter().map(to_provisional_form).collect()),
        Expr::And(operands) => Expr::And(operands.iter().map(to_provisional_form).collect()),
        Expr::OneOrMore(inner) => Expr::OneOrMore(boxed(inner)),
        Expr::ZeroOrMore(inner) | Expr::ZeroOrMoreProvisional(inner) => {
            Expr::ZeroOrMoreProvisional(boxed(inner))
        }
        Expr::ZeroOrOne(inner) | Expr::ZeroOrOneProvisional(inner) => {
            Expr::ZeroOrOneProvisional(boxed(inner))
        }
    }
}

fn simplify_or(a: Expr, b: Expr) -> Expr {
    rewrite_or(&a, &b).unwrap_or_else(|| Expr::Or(vec![a, b]))
}

fn rewrite_or(a: &Expr, b: &Expr) -> Option<Expr> {
    use Expr::{OneOrMore, ZeroOrMore, ZeroOrOne};

    if a == b {
        return Some(a.clone());
    }
    let rewritten = match (a, b) {
        (OneOrMore(x), OneOrMore(y)) if x == y => a.clone(),
        (OneOrMore(x), ZeroOrMore(y)) if x == y => b.clone(),
        (OneOrMore(x), ZeroOrOne(y)) if x == y => ZeroOrMore(y.clone()),
        (OneOrMore(x), _) if **x == *b => a.clone(),
        (_, OneOrMore(y)) if *a == **y => b.clone(),
        (ZeroOrMore(x), OneOrMore(y)) if x == y => a.clone(),
        (ZeroOrMore(x), ZeroOrMore(y)) if x == y => a.clone(),
        (ZeroOrMore(x), ZeroOrOne(y)) if x == y => a.clone(),
        (ZeroOrMore(x), _) if **x == *b => a.clone(),
        (_, ZeroOrMore(y)) if *a == **y => b.clone(),
        (ZeroOrOne(x), OneOrMore(y)) if x == y => ZeroOrMore(x.clone()),
        (ZeroOrOne(x), ZeroOrMore(y)) if x == y => b.clone(),
        (ZeroOrOne(x), ZeroOrOne(y)) if x != y => {
            ZeroOrOne(Box::new(Expr::Or(vec![(**x).clone(), (**y).clone()])))
        }
        (ZeroOrOne(x), _) if **x == *b => a.clone(),
        (_, ZeroOrOne(y)) if *a == **y => b.clone(),
        _ => return None,
    };
    Some(rewritten)
}

fn simplify_then(a: Expr, b: Expr) -> Expr {
    rewrite_then(&a, &b).unwrap_or_else(|| Expr::Then(Box::new(a), Box::new(b)))
}

fn rewrite_then(a: &Expr, b: &Expr) -> Option<Expr> {
    use Expr::{OneOrMore, ZeroOrMore, ZeroOrOne};

    let rewritten = match (a, b) {
        (OneOrMore(x), OneOrMore(y)) if x == y => Expr::Then(x.clone(), Box::new(b.clone())),
        (OneOrMore(x), ZeroOrMore(y)) if x == y => a.clone(),
        (OneOrMore(x), ZeroOrOne(y)) if x == y => a.clone(),
        (ZeroOrMore(x), OneOrMore(y)) if x == y => b.clone(),
        (ZeroOrMore(x), ZeroOrMore(y)) if x == y => a.clone(),
        (ZeroOrMore(x), ZeroOrOne(y)) if x == y => a.clone(),
        (ZeroOrMore(x), _) if **x == *b => OneOrMore(Box::new(b.clone())),
        (_, ZeroOrMore(y)) if *a == **y => OneOrMore(Box::new(a.clone())),
        (ZeroOrOne(x), OneOrMore(y)) if x == y => b.clone(),
        (ZeroOrOne(x), ZeroOrMore(y)) if x == y => OneOrMore(y.clone()),
        _ => return None,
    };
    Some(rewritten)
}

fn simplify_one_or_more(inner: Expr) -> Expr {
    match inner {
        Expr::ZeroOrMore(_) | Expr::OneOrMore(_) => inner,
        Expr::ZeroOrOne(y) => Expr::ZeroOrMore(y),
        other => Expr::OneOrMore(Box::new(other)),
    }
}

fn simplify_zero_or_more(inner: Expr) -> Expr {
    match inner {
        Expr::OneOrMore(y) | Expr::ZeroOrOne(y) => Expr::ZeroOrMore(y),
        Expr::ZeroOrMore(_) => inner,
        other => Expr::ZeroOrMore(Box::new(other)),
    }
}

fn simplify_zero_or_one(inner: Expr) -> Expr {
    match inner {
        Expr::OneOrMore(y) => Expr::ZeroOrMore(y),
        Expr::ZeroOrMore(_) | Expr::ZeroOrOne(_) => inner,
        other => Expr::ZeroOrOne(Box::new(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a() -> Expr {
        Expr::atom("a")
    }

    fn b() -> Expr {
        Expr::atom("b")
    }

    #[test]
    fn test_or_of_identical_operands() {
        assert_eq!(simplify(&Expr::or([a(), a()])), a());
    }

    #[test]
    fn test_or_absorption() {
        let plus = Expr::one_or_more(a());
        let star = Expr::zero_or_more(a());
        let opt = Expr::zero_or_one(a());

        assert_eq!(simplify(&Expr::or([plus.clone(), star.clone()])), star);
        assert_eq!(simplify(&Expr::or([plus.clone(), opt.clone()])), star);
        assert_eq!(simplify(&Expr::or([plus.clone(), a()])), plus);
        assert_eq!(simplify(&Expr::or([a(), plus.clone()])), plus);
        assert_eq!(simplify(&Expr::or([star.clone(), opt.clone()])), star);
        assert_eq!(simplify(&Expr::or([a(), star.clone()])), star);
        assert_eq!(simplify(&Expr::or([opt.clone(), plus])), star);
        assert_eq!(simplify(&Expr::or([opt.clone(), a()])), opt);
        assert_eq!(simplify(&Expr::or([a(), opt.clone()])), opt);
    }

    #[test]
    fn test_or_of_distinct_optionals() {
        let expr = Expr::or([Expr::zero_or_one(a()), Expr::zero_or_one(b())]);
        assert_eq!(simplify(&expr), Expr::zero_or_one(Expr::or([a(), b()])));
    }

    #[test]
    fn test_or_without_rule_is_kept() {
        let expr = Expr::or([a(), b()]);
        assert_eq!(simplify(&expr), expr);
    }

    #[test]
    fn test_then_one_or_more_pair() {
        let expr = Expr::then(Expr::one_or_more(a()), Expr::one_or_more(a()));
        assert_eq!(simplify(&expr), Expr::then(a(), Expr::one_or_more(a())));
    }

    #[test]
    fn test_then_rules() {
        let plus = Expr::one_or_more(a());
        let star = Expr::zero_or_more(a());
        let opt = Expr::zero_or_one(a());

        assert_eq!(simplify(&Expr::then(plus.clone(), star.clone())), plus);
        assert_eq!(simplify(&Expr::then(plus.clone(), opt.clone())), plus);
        assert_eq!(simplify(&Expr::then(star.clone(), plus.clone())), plus);
        assert_eq!(simplify(&Expr::then(star.clone(), star.clone())), star);
        assert_eq!(simplify(&Expr::then(star.clone(), opt.clone())), star);
        assert_eq!(simplify(&Expr::then(star.clone(), a())), plus);
        assert_eq!(simplify(&Expr::then(a(), star.clone())), plus);
        assert_eq!(simplify(&Expr::then(opt.clone(), plus.clone())), plus);
        assert_eq!(simplify(&Expr::then(opt, star)), plus);
    }

    #[test]
    fn test_unary_nesting() {
        assert_eq!(
            simplify(&Expr::one_or_more(Expr::zero_or_more(a()))),
            Expr::zero_or_more(a())
        );
        assert_eq!(
            simplify(&Expr::one_or_more(Expr::zero_or_one(a()))),
            Expr::zero_or_more(a())
        );
        assert_eq!(
            simplify(&Expr::zero_or_more(Expr::one_or_more(a()))),
            Expr::zero_or_more(a())
        );
        assert_eq!(
            simplify(&Expr::zero_or_one(Expr::one_or_more(a()))),
            Expr::zero_or_more(a())
        );
        assert_eq!(
            simplify(&Expr::zero_or_one(Expr::zero_or_one(a()))),
            Expr::zero_or_one(a())
        );
    }

    #[test]
    fn test_rewrites_apply_bottom_up() {
        // Inner Or collapses to `a`, which then meets `zero-or-more a`.
        let expr = Expr::then(Expr::or([a(), a()]), Expr::zero_or_more(a()));
        assert_eq!(simplify(&expr), Expr::one_or_more(a()));
    }

    #[test]
    fn test_and_is_left_as_parsed() {
        let expr = Expr::and([Expr::or([a(), a()]), b()]);
        assert_eq!(simplify(&expr), expr);
    }

    #[test]
    fn test_provisional_form() {
        let expr = Expr::then(
            Expr::zero_or_more(a()),
            Expr::and([Expr::zero_or_one(b()), Expr::one_or_more(a())]),
        );
        let expected = Expr::then(
            Expr::ZeroOrMoreProvisional(Box::new(a())),
            Expr::and([
                Expr::ZeroOrOneProvisional(Box::new(b())),
                Expr::one_or_more(a()),
            ]),
        );
        assert_eq!(to_provisional_form(&expr), expected);
    }
}
