use egg::{define_language, EGraph, Id, Pattern, RecExpr, Searcher, Symbol, Var};
use log::debug;

define_language! {
    /// The expression language of schedule block bodies.
    pub enum ComputeLanguage {
        "+" = Add([Id; 2]),
        "-" = Sub([Id; 2]),
        "*" = Mul([Id; 2]),
        "/" = Div([Id; 2]),
        "max" = Max([Id; 2]),
        "min" = Min([Id; 2]),

        // (load <tensor: Symbol> <index: Index>)
        "load" = Load([Id; 2]),
        // (index <var>...)
        "index" = Index(Box<[Id]>),

        // (reduce-<op> <body> <axes: Axes>)
        // Combines <body> over every point of the listed reduce axes.
        "reduce-sum" = ReduceSum([Id; 2]),
        "reduce-mul" = ReduceMul([Id; 2]),
        "reduce-max" = ReduceMax([Id; 2]),
        "reduce-min" = ReduceMin([Id; 2]),
        // (axes <var>...)
        "axes" = Axes(Box<[Id]>),

        Num(i64),
        Symbol(Symbol),
    }
}

pub type ComputeExpr = RecExpr<ComputeLanguage>;

/// How a block body combines values across iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulation {
    /// An explicit `reduce-*` node.
    Reduce,
    /// An update of the block's own output, e.g. `C[i, j] = C[i, j] + ...`.
    SelfUpdate,
}

type EG = EGraph<ComputeLanguage, ()>;

fn reduction_patterns() -> Vec<Pattern<ComputeLanguage>> {
    [
        "(reduce-sum ?body ?axes)",
        "(reduce-mul ?body ?axes)",
        "(reduce-max ?body ?axes)",
        "(reduce-min ?body ?axes)",
    ]
    .iter()
    .map(|s| s.parse().unwrap())
    .collect()
}

fn self_update_patterns() -> Vec<Pattern<ComputeLanguage>> {
    ["+", "*", "max", "min"]
        .iter()
        .flat_map(|op| {
            vec![
                format!("({} (load ?out ?idx) ?rhs)", op),
                format!("({} ?lhs (load ?out ?idx))", op),
            ]
        })
        .map(|s| s.parse().unwrap())
        .collect()
}

fn is_symbol(egraph: &EG, id: Id, name: &str) -> bool {
    egraph[id].nodes.iter().any(|enode| match enode {
        ComputeLanguage::Symbol(s) => s.as_str() == name,
        _ => false,
    })
}

/// Searches `body` for an innermost combine-and-accumulate pattern. `output`
/// is the name of the tensor the block writes, used to recognize
/// self-updating accumulations.
pub fn find_accumulation(body: &ComputeExpr, output: &str) -> Option<Accumulation> {
    let mut egraph = EG::default();
    egraph.add_expr(body);
    egraph.rebuild();

    if reduction_patterns()
        .iter()
        .any(|pattern| !pattern.search(&egraph).is_empty())
    {
        debug!("{}: found reduction in {}", output, body);
        return Some(Accumulation::Reduce);
    }

    let out: Var = "?out".parse().unwrap();
    let found = self_update_patterns().iter().any(|pattern| {
        pattern.search(&egraph).iter().any(|matches| {
            matches
                .substs
                .iter()
                .any(|subst| is_symbol(&egraph, subst[out], output))
        })
    });
    if found {
        debug!("{}: found self-update in {}", output, body);
        Some(Accumulation::SelfUpdate)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elementwise_has_no_accumulation() {
        let body: ComputeExpr = "(* (load A (index i j)) (load B (index i j)))"
            .parse()
            .unwrap();
        assert_eq!(find_accumulation(&body, "C"), None);
    }

    #[test]
    fn reduce_sum() {
        let body: ComputeExpr =
            "(reduce-sum (* (load A (index i k)) (load B (index k j))) (axes k))"
                .parse()
                .unwrap();
        assert_eq!(find_accumulation(&body, "C"), Some(Accumulation::Reduce));
    }

    #[test]
    fn reduce_max_nested() {
        let body: ComputeExpr = "(+ 1 (reduce-max (load A (index i k)) (axes k)))"
            .parse()
            .unwrap();
        assert_eq!(find_accumulation(&body, "C"), Some(Accumulation::Reduce));
    }

    #[test]
    fn self_update() {
        let body: ComputeExpr =
            "(+ (load C (index i j)) (* (load A (index i k)) (load B (index k j))))"
                .parse()
                .unwrap();
        assert_eq!(find_accumulation(&body, "C"), Some(Accumulation::SelfUpdate));

        let commuted: ComputeExpr = "(max (load A (index i k)) (load C (index i)))"
            .parse()
            .unwrap();
        assert_eq!(
            find_accumulation(&commuted, "C"),
            Some(Accumulation::SelfUpdate)
        );
    }

    #[test]
    fn update_of_other_tensor_is_not_accumulation() {
        // Reads D, but writes C: plain elementwise add.
        let body: ComputeExpr = "(+ (load D (index i j)) (load A (index i j)))"
            .parse()
            .unwrap();
        assert_eq!(find_accumulation(&body, "C"), None);
    }
}
