use rand::Rng;

/// Counter value at the start of every session.
pub const FULL_LOBBY: u32 = 100;
const FLOOR_TARGET: u32 = 2;
const CURVE_SPAN: f64 = 98.0;

/// Where the curve wants the counter to be when `index` becomes the current question.
pub fn target_for(index: usize, total: usize) -> u32 {
  if total < 2 {
    return FLOOR_TARGET;
  }
  let progress = index as f64 / (total - 1) as f64;
  let target = (FULL_LOBBY as f64 - progress * CURVE_SPAN).floor();
  (target.max(0.0) as u32).max(FLOOR_TARGET)
}

/// Cosmetic "players remaining" after the player moves on to `next_index`.
///
/// Never increases and never drops below 1. Reaching the final question (or
/// running past it) pins the counter at 1.
pub fn next_remaining<R: Rng + ?Sized>(
  current: u32,
  next_index: usize,
  total: usize,
  rng: &mut R,
) -> u32 {
  if next_index == 0 {
    return current;
  }
  if next_index + 1 >= total {
    return 1;
  }
  let target = target_for(next_index, total);
  let gap = current.saturating_sub(target).max(1);
  let drop = rng.gen_range(0..gap).max(1);
  current.saturating_sub(drop).max(1)
}
