use tracing::trace;

use crate::duals::DualPrices;
use crate::error::Error;
use crate::pattern::{Pattern, PatternId};
use crate::piece::Piece;
use crate::pricing::{candidates, PricingResult, PricingSolver};

/// Default limit on the number of cells of the dynamic-programming table.
pub const DEFAULT_CELL_BUDGET: usize = 1 << 26;

/// Exact 0/1 knapsack.
///
/// Uses dynamic programming over the rod length, which takes `O(n * capacity / g)` time and
/// memory where `g` is the greatest common divisor of the lengths of the pieces taking part. When
/// that table would exceed the cell budget, a depth-first branch and bound is used instead, whose
/// memory does not depend on the rod length. Ties are broken towards the earlier piece, so the
/// result is deterministic for identical input.
#[derive(Debug, Clone, Copy)]
pub struct KnapsackPricer {
    cell_budget: usize,
}

impl Default for KnapsackPricer {
    fn default() -> Self {
        KnapsackPricer {
            cell_budget: DEFAULT_CELL_BUDGET,
        }
    }
}

impl KnapsackPricer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest dynamic-programming table, in cells, before switching to branch and bound.
    pub fn with_cell_budget(mut self, cells: usize) -> Self {
        self.cell_budget = cells;
        self
    }
}

impl PricingSolver for KnapsackPricer {
    fn price(
        &mut self,
        pieces: &[Piece],
        duals: &DualPrices,
        capacity: u32,
        id: PatternId,
    ) -> Result<PricingResult, Error> {
        let items: Vec<Piece> = candidates(pieces, duals, capacity).copied().collect();
        let weighted: Vec<(u32, f64)> = items
            .iter()
            .map(|p| (p.length(), duals.get(p.id())))
            .collect();

        let chosen = solve_knapsack(&weighted, capacity, self.cell_budget);
        trace!(items = items.len(), chosen = chosen.len(), capacity, "knapsack solved");

        let pattern = Pattern::new(id, chosen.into_iter().map(|i| items[i]).collect(), capacity)?;
        Ok(PricingResult::new(pattern, duals, true))
    }

    fn is_exact(&self) -> bool {
        true
    }
}

/// Maximizes the total profit over subsets of `(weight, profit)` items whose total weight is at
/// most `capacity`. Returns the chosen indices in increasing order.
///
/// Items with non-positive profit are never chosen. Zero weights are allowed. The
/// dynamic-programming table is only built if it has at most `cell_budget` cells.
pub fn solve_knapsack(items: &[(u32, f64)], capacity: u32, cell_budget: usize) -> Vec<usize> {
    let useful: Vec<usize> = (0..items.len())
        .filter(|&i| items[i].1 > 0.0 && items[i].0 <= capacity)
        .collect();
    if useful.is_empty() {
        return Vec::new();
    }

    let scale = useful.iter().map(|&i| items[i].0).fold(0, gcd).max(1);
    let width = (capacity / scale) as usize + 1;
    match useful.len().checked_mul(width) {
        Some(cells) if cells <= cell_budget => dynamic_program(items, &useful, scale, width),
        _ => {
            trace!(items = useful.len(), width, "table too large, branching instead");
            branch_and_bound(items, &useful, capacity)
        }
    }
}

fn dynamic_program(items: &[(u32, f64)], useful: &[usize], scale: u32, width: usize) -> Vec<usize> {
    let weight = |i: usize| (items[i].0 / scale) as usize;

    // best[w]: best profit with scaled length at most w
    let mut best = vec![0.0f64; width];
    // take[k * width + w]: item k improved best[w] when it was processed
    let mut take = vec![false; useful.len() * width];
    for (k, &i) in useful.iter().enumerate() {
        let w_i = weight(i);
        for w in (w_i..width).rev() {
            let candidate = best[w - w_i] + items[i].1;
            if candidate > best[w] {
                best[w] = candidate;
                take[k * width + w] = true;
            }
        }
    }

    let mut chosen = Vec::new();
    let mut w = width - 1;
    for (k, &i) in useful.iter().enumerate().rev() {
        if take[k * width + w] {
            chosen.push(i);
            w -= weight(i);
        }
    }
    chosen.reverse();
    chosen
}

/// Depth-first search over the items by decreasing profit per length, pruned with the fractional
/// relaxation of the remaining items.
struct BranchAndBound<'a> {
    items: &'a [(u32, f64)],
    order: Vec<usize>,
    current: Vec<usize>,
    best: f64,
    best_set: Vec<usize>,
}

impl BranchAndBound<'_> {
    fn ratio(&self, i: usize) -> f64 {
        let (weight, profit) = self.items[i];
        if weight == 0 {
            f64::INFINITY
        } else {
            profit / f64::from(weight)
        }
    }

    /// Upper bound on what the items from `pos` on can add within `room`.
    fn bound(&self, pos: usize, mut room: u64) -> f64 {
        let mut gain = 0.0;
        for &i in &self.order[pos..] {
            let (weight, profit) = self.items[i];
            let weight = u64::from(weight);
            if weight <= room {
                room -= weight;
                gain += profit;
            } else {
                return gain + profit * room as f64 / weight as f64;
            }
        }
        gain
    }

    fn visit(&mut self, pos: usize, room: u64, value: f64) {
        if value > self.best {
            self.best = value;
            self.best_set = self.current.clone();
        }
        if pos == self.order.len() || value + self.bound(pos, room) <= self.best {
            return;
        }
        let i = self.order[pos];
        let (weight, profit) = self.items[i];
        if u64::from(weight) <= room {
            self.current.push(i);
            self.visit(pos + 1, room - u64::from(weight), value + profit);
            self.current.pop();
        }
        self.visit(pos + 1, room, value);
    }
}

fn branch_and_bound(items: &[(u32, f64)], useful: &[usize], capacity: u32) -> Vec<usize> {
    let mut search = BranchAndBound {
        items,
        order: useful.to_vec(),
        current: Vec::with_capacity(useful.len()),
        best: 0.0,
        best_set: Vec::new(),
    };
    let mut order = std::mem::take(&mut search.order);
    order.sort_by(|&a, &b| search.ratio(b).total_cmp(&search.ratio(a)).then(a.cmp(&b)));
    search.order = order;

    search.visit(0, u64::from(capacity), 0.0);
    let mut chosen = search.best_set;
    chosen.sort_unstable();
    chosen
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::pricing::tests::{brute_force, duals, pieces};

    #[test]
    fn picks_best_pair() {
        let p = pieces(&[110, 150, 125, 140, 105, 123]);
        let d = duals(&[0.2, 1.0, 0.5, 0.9, 0.6, 0.1]);
        let result = KnapsackPricer::new().price(&p, &d, 250, PatternId(6)).unwrap();
        // no three pieces fit, 140 + 105 is the most valuable pair
        let ids: Vec<_> = result.pattern.pieces().iter().map(|p| p.id().0).collect();
        assert_eq!(ids, vec![3, 4]);
        assert!((result.objective - 1.5).abs() < 1e-12);
        assert!((result.reduced_cost + 0.5).abs() < 1e-12);
        assert!(result.exact);
        assert_eq!(result.pattern.id(), PatternId(6));
    }

    #[test]
    fn zero_capacity_gives_empty_pattern() {
        let p = pieces(&[10, 20]);
        let d = duals(&[1.0, 1.0]);
        let result = KnapsackPricer::new().price(&p, &d, 0, PatternId(0)).unwrap();
        assert!(result.pattern.is_empty());
        assert_eq!(result.objective, 0.0);
        assert_eq!(result.reduced_cost, 1.0);
    }

    #[test]
    fn nothing_fits() {
        let p = pieces(&[300, 400]);
        let d = duals(&[1.0, 1.0]);
        let result = KnapsackPricer::new().price(&p, &d, 150, PatternId(0)).unwrap();
        assert!(result.pattern.is_empty());
        assert_eq!(result.objective, 0.0);
    }

    #[test]
    fn ignores_non_positive_prices() {
        let p = pieces(&[10, 10, 10]);
        let d = duals(&[0.0, -1.0, 0.3]);
        let result = KnapsackPricer::new().price(&p, &d, 100, PatternId(0)).unwrap();
        let ids: Vec<_> = result.pattern.pieces().iter().map(|p| p.id().0).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn exact_fill() {
        let budget = DEFAULT_CELL_BUDGET;
        assert_eq!(solve_knapsack(&[(50, 1.0), (50, 1.0), (60, 1.5)], 100, budget), vec![0, 1]);
        assert_eq!(solve_knapsack(&[(50, 1.0), (50, 1.0), (60, 2.5)], 100, budget), vec![2]);
        assert_eq!(solve_knapsack(&[(50, 1.0), (50, 1.0), (60, 1.5)], 100, 0), vec![0, 1]);
        assert_eq!(solve_knapsack(&[(50, 1.0), (50, 1.0), (60, 2.5)], 100, 0), vec![2]);
    }

    #[test]
    fn large_capacity_with_common_divisor() {
        let chosen = solve_knapsack(
            &[(400_000_000, 1.0), (600_000_000, 1.0), (500_000_000, 1.5)],
            1_000_000_000,
            DEFAULT_CELL_BUDGET,
        );
        assert_eq!(chosen, vec![0, 2]);
    }

    #[test]
    fn huge_rod_with_coprime_lengths_stays_within_memory() {
        // 30 primes around 1e6 on a rod of 1e8 would need a table of 3e9 cells
        let lengths: Vec<u32> = (1_000_000u32..)
            .filter(|&n| (2..).take_while(|d| d * d <= n).all(|d| n % d != 0))
            .take(30)
            .collect();
        let prices: Vec<f64> = (0..30).map(|i| 0.01 + f64::from(i) * 0.001).collect();
        let p = pieces(&lengths);
        let d = duals(&prices);

        let result = KnapsackPricer::new()
            .price(&p, &d, 100_000_000, PatternId(0))
            .unwrap();
        // every piece fits at once
        assert_eq!(result.pattern.len(), 30);
        assert!((result.objective - prices.iter().sum::<f64>()).abs() < 1e-9);

        let result = KnapsackPricer::new()
            .price(&p, &d, 10_000_000, PatternId(0))
            .unwrap();
        assert!(result.pattern.fits(10_000_000));
        // the nine most valuable pieces fit, a tenth never does
        assert_eq!(result.pattern.len(), 9);
        let best_nine: f64 = prices[21..].iter().sum();
        assert!((result.objective - best_nine).abs() < 1e-9);
    }

    #[test]
    fn matches_brute_force_on_random_instances() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let n = rng.gen_range(1..=10);
            let lengths: Vec<u32> = (0..n).map(|_| rng.gen_range(1..=100)).collect();
            let prices: Vec<f64> = (0..n).map(|_| rng.gen_range(-0.2..1.0)).collect();
            let capacity = rng.gen_range(0..=250);
            let p = pieces(&lengths);
            let d = duals(&prices);

            let expected = brute_force(&p, &d, capacity);
            let table = KnapsackPricer::new().price(&p, &d, capacity, PatternId(0)).unwrap();
            assert!(table.pattern.fits(capacity));
            assert!((table.objective - expected).abs() < 1e-9);

            let search = KnapsackPricer::new()
                .with_cell_budget(0)
                .price(&p, &d, capacity, PatternId(0))
                .unwrap();
            assert!(search.pattern.fits(capacity));
            assert!((search.objective - expected).abs() < 1e-9);
        }
    }
}
