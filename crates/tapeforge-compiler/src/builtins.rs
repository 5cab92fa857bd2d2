//! The built-in macro signature catalog.
//!
//! Grounded on `examples/original_source/VarfuckTranspiler.py`'s
//! `inbuilt_macros` table: a fixed repertoire of macros the Processor
//! recognizes for type-checking (compile-time parameter count, run-time
//! parameter sizes, return sizes) without ever building a real
//! `StackManager` body for them — their bodies are opaque call templates
//! expanded later by the macro-language expander (`tapeforge-vm`).

use crate::constexpr::{ConstExpr, ExprTok};
use crate::macro_model::Macro;
use crate::stack_manager::BinX;

/// The bit-width bound to a builtin's sole compile-time parameter, `n`.
fn n() -> ConstExpr {
    ConstExpr::from_tokens(vec![ExprTok::Ref("n".to_string())], true)
}

fn var(name: &str, size: ConstExpr) -> BinX {
    BinX::new(Some(name.to_string()), size)
}

/// Builds the full catalog, keyed by name.
pub fn catalog() -> Vec<Macro> {
    let mut out = Vec::new();

    // Binary n-bit arithmetic/logic ops: (a, b) -> result, all n bits.
    for name in [
        "addbinx", "subbinx", "multbinx", "divbinx", "lshiftbinx", "rshiftbinx", "eqbinx", "diffbinx",
        "lessbinx", "greatbinx", "orbinx", "andbinx",
    ] {
        out.push(Macro::new_builtin(
            name.to_string(),
            vec!["n".to_string()],
            vec![var("a", n()), var("b", n())],
            vec![n()],
        ));
    }

    // Unary n-bit op: a -> result, n bits.
    out.push(Macro::new_builtin(
        "notbinx".to_string(),
        vec!["n".to_string()],
        vec![var("a", n())],
        vec![n()],
    ));

    // `boolbinx`: fold n bits down to a single boolean cell. Used by
    // `StackManager::start_while`/`start_if` to reduce a condition variable
    // before testing it, so its return width is fixed at 1, not `n`.
    out.push(Macro::new_builtin(
        "boolbinx".to_string(),
        vec!["n".to_string()],
        vec![var("a", n())],
        vec![ConstExpr::literal(1)],
    ));

    // Single-cell boolean ops: fixed width 1, no compile-time parameter.
    for name in ["orbool", "andbool"] {
        out.push(Macro::new_builtin(
            name.to_string(),
            Vec::new(),
            vec![var("a", ConstExpr::literal(1)), var("b", ConstExpr::literal(1))],
            vec![ConstExpr::literal(1)],
        ));
    }
    out.push(Macro::new_builtin(
        "notbool".to_string(),
        Vec::new(),
        vec![var("a", ConstExpr::literal(1))],
        vec![ConstExpr::literal(1)],
    ));

    // `copy`: duplicate an n-bit variable.
    out.push(Macro::new_builtin(
        "copy".to_string(),
        vec!["n".to_string()],
        vec![var("a", n())],
        vec![n()],
    ));

    // `implant`: materialize a compile-time literal as a fresh n-bit value.
    out.push(Macro::new_builtin(
        "implant".to_string(),
        vec!["n".to_string(), "value".to_string()],
        Vec::new(),
        vec![n()],
    ));

    // `kill`: destroy an n-bit variable, no return.
    out.push(Macro::new_builtin(
        "kill".to_string(),
        vec!["n".to_string()],
        vec![var("a", n())],
        Vec::new(),
    ));

    // I/O: printbinx/printintbinx consume, no return; getintbinx produces.
    out.push(Macro::new_builtin(
        "printbinx".to_string(),
        vec!["n".to_string()],
        vec![var("a", n())],
        Vec::new(),
    ));
    out.push(Macro::new_builtin(
        "printintbinx".to_string(),
        vec!["n".to_string()],
        vec![var("a", n())],
        Vec::new(),
    ));
    out.push(Macro::new_builtin(
        "getintbinx".to_string(),
        vec!["n".to_string()],
        Vec::new(),
        vec![n()],
    ));

    // Fixed ASCII helpers: zero compile-time/run-time parameters.
    out.push(Macro::new_builtin("endl".to_string(), Vec::new(), Vec::new(), Vec::new()));
    out.push(Macro::new_builtin("space".to_string(), Vec::new(), Vec::new(), Vec::new()));

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_all_twenty_five_names() {
        let names: std::collections::HashSet<_> = catalog().into_iter().map(|m| m.name.clone()).collect();
        assert_eq!(names.len(), 25);
        for expected in [
            "implant", "kill", "printbinx", "printintbinx", "endl", "space", "addbinx", "subbinx",
            "multbinx", "divbinx", "lshiftbinx", "rshiftbinx", "eqbinx", "diffbinx", "lessbinx",
            "greatbinx", "orbinx", "andbinx", "notbinx", "boolbinx", "orbool", "andbool", "notbool",
            "copy", "getintbinx",
        ] {
            assert!(names.contains(expected), "missing builtin `{expected}`");
        }
    }

    #[test]
    fn addbinx_is_generic_over_bit_width() {
        let m = catalog().into_iter().find(|m| m.name == "addbinx").unwrap();
        assert_eq!(m.compile_time_params, vec!["n".to_string()]);
        assert_eq!(m.run_time_params.len(), 2);
        assert_eq!(m.return_sizes.len(), 1);
    }
}
