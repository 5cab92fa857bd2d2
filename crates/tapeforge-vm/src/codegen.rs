//! Hand-written raw-instruction generators for the representative builtin
//! subset, grounded in the *shape* of
//! `examples/original_source/MacrofuckCompiler.py`'s `mac_*` templates —
//! move-by-scratch-cell, copy-via-duplication, flag/temp-cell dispatch —
//! without literally reproducing their deeply nested `ifel` carry chains
//! (see DESIGN.md, Open-question decision 8). Every helper here documents
//! its own calling convention: where the pointer starts, where it ends, and
//! which cells it treats as free scratch.

use tapeforge_isa::Instr;

/// `n` copies of `<` (n<0) or `>` (n>0), the universal building block below.
pub fn shift(n: i64) -> Vec<Instr> {
    if n >= 0 {
        vec![Instr::Right; n as usize]
    } else {
        vec![Instr::Left; (-n) as usize]
    }
}

/// `[-]`: zeros the current cell.
pub fn zero_cell() -> Vec<Instr> {
    vec![Instr::JumpIfZero, Instr::Dec, Instr::JumpIfNonzero]
}

/// `[- shift(dist) + shift(-dist)]`: moves the current cell's value `dist`
/// cells away, adding it into the destination, and returns the pointer to
/// its starting position. The classic BF move-add idiom.
pub fn move_add(dist: i64) -> Vec<Instr> {
    let mut v = vec![Instr::JumpIfZero, Instr::Dec];
    v.extend(shift(dist));
    v.push(Instr::Inc);
    v.extend(shift(-dist));
    v.push(Instr::JumpIfNonzero);
    v
}

/// Non-destructively duplicates the current cell `dist` cells away, using
/// the cell at `dist + sign(dist)` (one further out, in the same direction)
/// as transient scratch. Leaves both the source and the pointer unchanged;
/// the destination ends up holding the source's original value (added into
/// whatever was already there).
///
/// Grounded on `mac_copyb`'s `[-{x}>>+>+<<{x}<]{x}>>>[-{x}<<<+{x}>>>]{x}<<<`
/// shape: drain the source into both destination and scratch in one pass,
/// then move the scratch copy back into the source to restore it.
pub fn copy_one(dist: i64) -> Vec<Instr> {
    let scratch = dist + dist.signum();
    let mut v = Vec::new();
    v.push(Instr::JumpIfZero);
    v.push(Instr::Dec);
    v.extend(shift(dist));
    v.push(Instr::Inc);
    v.extend(shift(scratch - dist));
    v.push(Instr::Inc);
    v.extend(shift(-scratch));
    v.push(Instr::JumpIfNonzero);
    v.extend(shift(scratch));
    v.extend(move_add(-scratch));
    v.extend(shift(-scratch));
    v
}

/// `copybinx(n, dist)`: non-destructively copies `n` consecutive cells,
/// starting at the pointer, to `n` consecutive cells starting `dist` cells
/// to the right. Leaves the pointer back at the first source cell.
///
/// Grounded on `mac_copybinx`'s `copyb(y){x-1}repeat(>copyb(y)){x-1}<`: the
/// scratch cell `copy_one` borrows for cell `i` is exactly the not-yet-filled
/// destination cell `i + 1`, which is guaranteed zero again by the time that
/// cell's own copy runs.
pub fn copybinx(n: i64, dist: i64) -> Vec<Instr> {
    assert!(n >= 1, "copybinx: n must be at least 1");
    let mut v = copy_one(dist);
    for _ in 0..(n - 1) {
        v.extend(shift(1));
        v.extend(copy_one(dist));
    }
    v.extend(shift(-(n - 1)));
    v
}

/// `downbinx(n, dist)`: destructively moves `n` consecutive cells, starting
/// at the pointer, `dist` cells to the *left*, adding into whatever was
/// there. Leaves the pointer back at the first (now-zeroed) source cell.
///
/// Grounded on `mac_downbinx`'s `{x}repeat(downb(y)>){x}<`.
pub fn downbinx(n: i64, dist: i64) -> Vec<Instr> {
    assert!(n >= 1, "downbinx: n must be at least 1");
    let mut v = Vec::new();
    for _ in 0..n {
        v.extend(move_add(-dist));
        v.extend(shift(1));
    }
    v.extend(shift(-n));
    v
}

/// The canonical BF if/else idiom, parameterized so callers can place the
/// two transient flag cells far enough away to avoid colliding with
/// operand cells the `then`/`else` bodies touch.
///
/// Calling convention: the pointer starts at the *flag* cell, which must
/// hold exactly 0 or 1. `then_code`/`else_code` are written as if the
/// pointer were still at the flag cell on entry and must return it there on
/// exit. `temp_offset` and `temp_offset + 1` (relative to the flag) must be
/// free scratch cells; they end up zeroed again regardless of branch. The
/// flag cell itself always ends at 0.
pub fn if_else(temp_offset: i64, then_code: Vec<Instr>, else_code: Vec<Instr>) -> Vec<Instr> {
    let t1 = temp_offset;
    let t2 = temp_offset + 1;
    let mut v = Vec::new();

    // Defensively clear both temps first; they should already be free.
    v.extend(shift(t1));
    v.extend(zero_cell());
    v.extend(shift(-t1));
    v.extend(shift(t2));
    v.extend(zero_cell());
    v.extend(shift(-t2));

    // temp_true = flag (moved), flag -> 0.
    v.extend(move_add(t1));
    // temp_false = 1.
    v.extend(shift(t2));
    v.push(Instr::Inc);
    v.extend(shift(-t2));

    // if temp_true: run then_code once, consuming the matching unit of
    // temp_false so the else-branch below is skipped.
    v.extend(shift(t1));
    v.push(Instr::JumpIfZero);
    v.extend(shift(t2 - t1));
    v.push(Instr::Dec);
    v.extend(shift(t1 - t2));
    v.extend(shift(-t1));
    v.extend(then_code);
    v.extend(shift(t1));
    v.push(Instr::Dec);
    v.push(Instr::JumpIfNonzero);
    v.extend(shift(-t1));

    // if temp_false (original flag was falsy): run else_code once.
    v.extend(shift(t2));
    v.push(Instr::JumpIfZero);
    v.extend(shift(-t2));
    v.extend(else_code);
    v.extend(shift(t2));
    v.push(Instr::Dec);
    v.push(Instr::JumpIfNonzero);
    v.extend(shift(-t2));

    v
}

/// `[ body ]` with `body` re-run as the loop's own condition recomputation —
/// the expander's `while(prefix;body)` form already carries the condition
/// recompute as part of `body` itself (see `expander.rs`), so this helper
/// is the bare loop wrapper.
pub fn while_loop(body: Vec<Instr>) -> Vec<Instr> {
    let mut v = vec![Instr::JumpIfZero];
    v.extend(body);
    v.push(Instr::JumpIfNonzero);
    v
}

/// Tracks an absolute cell position while a generator function emits
/// instructions, so each step can `goto` an absolute offset instead of
/// manually accumulating relative shifts.
pub struct Cur(pub i64);

impl Cur {
    pub fn goto(&mut self, v: &mut Vec<Instr>, target: i64) {
        v.extend(shift(target - self.0));
        self.0 = target;
    }
}

/// AND of the current (flag) cell with the cell `dist` away, written back
/// into the flag cell; the other operand is cleared either way. Both cells
/// must hold 0 or 1. `temp_offset`/`temp_offset + 1` (relative to the flag)
/// must be free scratch not otherwise touched by `dist`'s operand.
pub fn bit_and_at(dist: i64, temp_offset: i64) -> Vec<Instr> {
    let take = {
        let mut v = shift(dist);
        v.extend(move_add(-dist));
        v.extend(shift(-dist));
        v
    };
    let clear = {
        let mut v = shift(dist);
        v.extend(zero_cell());
        v.extend(shift(-dist));
        v
    };
    if_else(temp_offset, take, clear)
}

/// OR of the flag cell with the cell `dist` away, same contract as
/// [`bit_and_at`].
pub fn bit_or_at(dist: i64, temp_offset: i64) -> Vec<Instr> {
    let take = {
        let mut v = shift(dist);
        v.extend(move_add(-dist));
        v.extend(shift(-dist));
        v
    };
    let clear = {
        let mut v = shift(dist);
        v.extend(zero_cell());
        v.extend(shift(-dist));
        v
    };
    if_else(temp_offset, clear, take)
}

/// Flips a 0/1 flag cell in place.
pub fn bit_not_inplace(temp_offset: i64) -> Vec<Instr> {
    if_else(temp_offset, Vec::new(), vec![Instr::Inc])
}

/// Doubles the current cell's value in place, using the adjacent cell at
/// `temp_dist` (assumed zero) as scratch.
pub fn double_in_place(temp_dist: i64) -> Vec<Instr> {
    let mut v = copy_one(temp_dist);
    v.extend(shift(temp_dist));
    v.extend(move_add(-temp_dist));
    v.extend(shift(-temp_dist));
    v
}

/// The standard "is this cell nonzero" idiom: `x[temp+x[-]]temp[x+temp-]`.
/// Leaves a 0/1 result in the current cell and the scratch cell at
/// `temp_dist` (assumed zero) back at zero. The inner `x[-]` drains `x`
/// fully on the first (and only) outer iteration, regardless of its
/// starting magnitude, which is what keeps the result boolean.
pub fn boolify_inplace(temp_dist: i64) -> Vec<Instr> {
    let mut v = Vec::new();
    v.extend(shift(temp_dist));
    v.extend(zero_cell());
    v.extend(shift(-temp_dist));
    v.push(Instr::JumpIfZero);
    v.extend(shift(temp_dist));
    v.push(Instr::Inc);
    v.extend(shift(-temp_dist));
    v.extend(zero_cell());
    v.push(Instr::JumpIfNonzero);
    v.extend(shift(temp_dist));
    v.push(Instr::JumpIfZero);
    v.extend(shift(-temp_dist));
    v.push(Instr::Inc);
    v.extend(shift(temp_dist));
    v.push(Instr::Dec);
    v.push(Instr::JumpIfNonzero);
    v.extend(shift(-temp_dist));
    v
}

/// Divides the current cell by two in place, leaving the quotient in the
/// current cell and depositing the remainder (0 or 1) into the cell at
/// `remainder_dist`. `remainder_dist` and `remainder_dist + 1` (relative to
/// the *current* cell, not the value being halved) must be free scratch.
///
/// Built from the parity-toggle idiom: every pair of decrements of the
/// value toggles a parity flag back to 0 and bumps a quotient counter,
/// so after the value drains to zero the parity flag holds `value mod 2`
/// and the quotient counter holds `value / 2`.
pub fn halve_with_remainder(remainder_dist: i64) -> Vec<Instr> {
    let quotient_dist = remainder_dist + 2;
    let test_dist = remainder_dist + 3;
    let temp_dist = remainder_dist + 4;
    let mut v = Vec::new();
    // Clear the scratch cells this routine owns.
    for d in [remainder_dist, quotient_dist, test_dist, temp_dist] {
        v.extend(shift(d));
        v.extend(zero_cell());
        v.extend(shift(-d));
    }
    v.push(Instr::JumpIfZero);
    v.extend(shift(remainder_dist));
    v.extend(bit_not_inplace(temp_dist - remainder_dist));
    v.extend(copy_one(test_dist - remainder_dist));
    v.extend(shift(test_dist - remainder_dist));
    v.extend(if_else(
        temp_dist - test_dist,
        Vec::new(),
        {
            let mut e = shift(quotient_dist - test_dist);
            e.push(Instr::Inc);
            e.extend(shift(test_dist - quotient_dist));
            e
        },
    ));
    v.extend(shift(-test_dist));
    v.push(Instr::Dec);
    v.push(Instr::JumpIfNonzero);
    // Move the quotient back onto the original cell (which is now 0), and
    // leave the remainder at `remainder_dist`.
    v.extend(shift(quotient_dist));
    v.extend(move_add(-quotient_dist));
    v.extend(shift(-quotient_dist));
    v
}

#[cfg(test)]
mod extra_tests {
    use super::*;

    #[test]
    fn halve_with_remainder_is_net_zero_excursion() {
        let body = halve_with_remainder(1);
        let net: i64 = body.iter().map(|i| i.pointer_delta()).sum();
        assert_eq!(net, 0);
    }

    #[test]
    fn boolify_inplace_is_net_zero_excursion() {
        let body = boolify_inplace(1);
        let net: i64 = body.iter().map(|i| i.pointer_delta()).sum();
        assert_eq!(net, 0);
    }

    #[test]
    fn double_in_place_is_net_zero_excursion() {
        let body = double_in_place(1);
        let net: i64 = body.iter().map(|i| i.pointer_delta()).sum();
        assert_eq!(net, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_picks_direction_from_sign() {
        assert_eq!(shift(3), vec![Instr::Right; 3]);
        assert_eq!(shift(-2), vec![Instr::Left; 2]);
        assert_eq!(shift(0), Vec::<Instr>::new());
    }

    #[test]
    fn move_add_is_net_zero_excursion() {
        let body = move_add(4);
        let net: i64 = body.iter().map(|i| i.pointer_delta()).sum();
        assert_eq!(net, 0);
    }

    #[test]
    fn copy_one_is_net_zero_excursion() {
        let body = copy_one(3);
        let net: i64 = body.iter().map(|i| i.pointer_delta()).sum();
        assert_eq!(net, 0);
    }

    #[test]
    fn copybinx_returns_to_first_source_cell() {
        let body = copybinx(3, 5);
        let net: i64 = body.iter().map(|i| i.pointer_delta()).sum();
        assert_eq!(net, 0);
    }

    #[test]
    fn downbinx_returns_to_first_source_cell() {
        let body = downbinx(4, 2);
        let net: i64 = body.iter().map(|i| i.pointer_delta()).sum();
        assert_eq!(net, 0);
    }

    #[test]
    fn if_else_returns_to_flag_cell() {
        let body = if_else(2, vec![Instr::Inc], vec![Instr::Dec]);
        let net: i64 = body.iter().map(|i| i.pointer_delta()).sum();
        assert_eq!(net, 0);
    }
}
