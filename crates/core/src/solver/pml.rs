//! Split-field perfectly matched layer
//!
//! The margin around the physical region carries an artificial conductivity
//! graded as `σ(d) = σ_max·(d/mgn)^m`, with
//! `σ_max = −(m+1)·ε0·c / (2·mgn·ds) · ln|r0|`. Each margin cell advances a split
//! component with the first-order recursive update
//!
//! ```text
//! ψ ← cs·ψ + csl·(∂ field)
//! cs  = (1 − a) / (1 + a)
//! csl = dt / (em0·ds) / (1 + a),   a = σ·dt / (2·ε0)
//! ```
//!
//! In 2-D TE mode Ex and Ey each see a single derivative direction, so the
//! visible margin value equals its split component. Hz is the sum of `hzx`
//! and `hzy`.
//!
//! The margin is covered by four disjoint rectangles per component. Bottom and
//! top strips span the full row width including the corners; left and right
//! strips span only the rows between them. The side strips therefore exclude
//! the four corner blocks. Bounds differ per component because of the
//! staggering and the one-cell stencil reach.

use super::coefficients::PmlPermittivity;
use super::fields::{try_zeroed, Component, FieldData, FieldState};
use crate::config::{NumericalParams, PhysicalConstants};
use crate::error::FdtdResult;
use crate::grid::{GridGeometry, Range};

/// Collocation offset of electric components (cell edges)
pub const OFFSET_E: usize = 0;
/// Collocation offset of the magnetic component (cell centers, half a cell ahead)
pub const OFFSET_H: usize = 1;

/// 1-D decay and loss factors along one axis of the whole range
#[derive(Debug, Clone, PartialEq)]
pub struct PmlTable {
    /// Recursive decay factor `cs`, 1 inside the physical region
    pub cs: Vec<f64>,
    /// Loss-scaled derivative factor `csl`
    pub csl: Vec<f64>,
}

impl PmlTable {
    /// Graded table along `axis` for a component with collocation `offset`
    ///
    /// The grading is measured from the global physical region so that seams
    /// between subdomains carry no absorption. `ds` is the cell size along
    /// `axis` and `em0` is ε0 for electric tables, μ0 for magnetic ones.
    pub fn graded(
        geometry: &GridGeometry,
        axis: usize,
        offset: usize,
        dt: f64,
        ds: f64,
        em0: f64,
        constants: &PhysicalConstants,
        numerics: &NumericalParams,
    ) -> FdtdResult<Self> {
        let whole = geometry.whole();
        let physical = geometry.inside_global();

        let begin = physical.begin[axis];
        let end = physical.end(axis);
        let e0 = constants.eps0;
        let mgn = geometry.mgn() as f64;
        let m = numerics.pml_order;
        let pmlec_max = -(m + 1.0) * e0 * constants.c / (2.0 * mgn * ds) * numerics.reflection.abs().ln();

        let n = whole.length[axis];
        let mut cs = try_zeroed::<f64>(n)?;
        let mut csl = try_zeroed::<f64>(n)?;

        for ii in 0..n {
            let i = ii as isize + whole.begin[axis];
            let x = i as f64 + offset as f64 * 0.5;

            let pmlec = if i < begin {
                pmlec_max * ((begin as f64 - x) / mgn).powf(m)
            } else if i > end - offset as isize {
                pmlec_max * ((x - end as f64) / mgn).powf(m)
            } else {
                0.0
            };

            let a = pmlec * dt / (2.0 * e0);
            cs[ii] = (1.0 - a) / (1.0 + a);
            csl[ii] = dt / (em0 * ds) / (1.0 + a);
        }

        Ok(Self { cs, csl })
    }
}

/// Which edge of the physical region a rectangle frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Below the physical region (smaller axis-1 indices)
    Bottom,
    /// Above the physical region
    Top,
    /// Left of the physical region, between the bottom and top strips
    Left,
    /// Right of the physical region, between the bottom and top strips
    Right,
}

/// Reference point a rectangle bound is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    WholeBegin,
    InsideBegin,
    InsideEnd,
    WholeEnd,
}

impl Anchor {
    fn resolve(self, axis: usize, whole: &Range, inside: &Range) -> isize {
        match self {
            Self::WholeBegin => whole.begin[axis],
            Self::InsideBegin => inside.begin[axis],
            Self::InsideEnd => inside.end(axis),
            Self::WholeEnd => whole.end(axis),
        }
    }
}

type Bound = (Anchor, isize);

/// Half-open `[lo, hi)` bounds along both axes, relative to anchors
#[derive(Debug, Clone, Copy)]
struct RectTemplate {
    side: Side,
    i: [Bound; 2],
    j: [Bound; 2],
}

use Anchor::{InsideBegin as IB, InsideEnd as IE, WholeBegin as WB, WholeEnd as WE};

const EX_RECTS: [RectTemplate; 4] = [
    RectTemplate { side: Side::Bottom, i: [(WB, 0), (WE, 0)], j: [(WB, 1), (IB, 0)] },
    RectTemplate { side: Side::Top, i: [(WB, 0), (WE, 0)], j: [(IE, 1), (WE, 0)] },
    RectTemplate { side: Side::Left, i: [(WB, 0), (IB, 0)], j: [(IB, 0), (IE, 1)] },
    RectTemplate { side: Side::Right, i: [(IE, 0), (WE, 0)], j: [(IB, 0), (IE, 1)] },
];

const EY_RECTS: [RectTemplate; 4] = [
    RectTemplate { side: Side::Bottom, i: [(WB, 1), (WE, 0)], j: [(WB, 0), (IB, 0)] },
    RectTemplate { side: Side::Top, i: [(WB, 1), (WE, 0)], j: [(IE, 0), (WE, 0)] },
    RectTemplate { side: Side::Left, i: [(WB, 1), (IB, 0)], j: [(IB, 0), (IE, 0)] },
    RectTemplate { side: Side::Right, i: [(IE, 1), (WE, 0)], j: [(IB, 0), (IE, 0)] },
];

const HZ_RECTS: [RectTemplate; 4] = [
    RectTemplate { side: Side::Bottom, i: [(WB, 0), (WE, -1)], j: [(WB, 0), (IB, 0)] },
    RectTemplate { side: Side::Top, i: [(WB, 0), (WE, -1)], j: [(IE, 0), (WE, -1)] },
    RectTemplate { side: Side::Left, i: [(WB, 0), (IB, 0)], j: [(IB, 0), (IE, 0)] },
    RectTemplate { side: Side::Right, i: [(IE, 0), (WE, -1)], j: [(IB, 0), (IE, 0)] },
];

/// One margin rectangle in global indices, half-open on both axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmlRect {
    /// Edge this rectangle frames
    pub side: Side,
    /// `[begin, end)` along axis 0
    pub i: [isize; 2],
    /// `[begin, end)` along axis 1
    pub j: [isize; 2],
}

impl PmlRect {
    /// Whether global cell `(i, j)` lies in the rectangle
    pub fn contains(&self, i: isize, j: isize) -> bool {
        i >= self.i[0] && i < self.i[1] && j >= self.j[0] && j < self.j[1]
    }

    /// Number of cells covered
    pub fn cells(&self) -> usize {
        let w = (self.i[1] - self.i[0]).max(0) as usize;
        let h = (self.j[1] - self.j[0]).max(0) as usize;
        w * h
    }
}

/// The four margin rectangles of `component` around `inside`
pub fn margin_rectangles(component: Component, whole: &Range, inside: &Range) -> [PmlRect; 4] {
    let templates = match component {
        Component::Ex => EX_RECTS,
        Component::Ey => EY_RECTS,
        Component::Hz => HZ_RECTS,
    };
    templates.map(|t| {
        let resolve = |axis: usize, (anchor, delta): Bound| anchor.resolve(axis, whole, inside) + delta;
        PmlRect {
            side: t.side,
            i: [resolve(0, t.i[0]), resolve(0, t.i[1])],
            j: [resolve(1, t.j[0]), resolve(1, t.j[1])],
        }
    })
}

/// Margin rectangles this rank updates
///
/// Bottom and top strips exist only at the global domain ends. On a rank with
/// an upper neighbor the Ex seam row belongs to that neighbor, so the side
/// strips stop one row earlier.
pub fn active_rectangles(component: Component, geometry: &GridGeometry) -> Vec<PmlRect> {
    margin_rectangles(component, geometry.whole(), geometry.inside())
        .into_iter()
        .filter(|rect| match rect.side {
            Side::Bottom => geometry.at_lower_boundary(),
            Side::Top => geometry.at_upper_boundary(),
            Side::Left | Side::Right => true,
        })
        .map(|mut rect| {
            if component == Component::Ex
                && matches!(rect.side, Side::Left | Side::Right)
                && !geometry.at_upper_boundary()
            {
                rect.j[1] = geometry.inside().end(1);
            }
            rect
        })
        .collect()
}

/// PML coefficient tables and margin partition of one rank
#[derive(Debug, Clone, PartialEq)]
pub struct PmlBoundary {
    /// Ex table along y
    pub cexy: PmlTable,
    /// Ey table along x
    pub ceyx: PmlTable,
    /// Hz table along x
    pub chzx: PmlTable,
    /// Hz table along y
    pub chzy: PmlTable,
    /// Reciprocal permittivity with object masking
    pub rer: PmlPermittivity,
    whole: Range,
    ex_rects: Vec<PmlRect>,
    ey_rects: Vec<PmlRect>,
    hz_rects: Vec<PmlRect>,
}

impl PmlBoundary {
    /// Build all four tables and the rectangle partition
    pub fn new(
        geometry: &GridGeometry,
        rer: PmlPermittivity,
        dt: f64,
        constants: &PhysicalConstants,
        numerics: &NumericalParams,
    ) -> FdtdResult<Self> {
        const AXIS_X: usize = 0;
        const AXIS_Y: usize = 1;
        let (dx, dy) = (numerics.dx, numerics.dy);
        let (e0, m0) = (constants.eps0, constants.mu0);

        Ok(Self {
            cexy: PmlTable::graded(geometry, AXIS_Y, OFFSET_E, dt, dy, e0, constants, numerics)?,
            ceyx: PmlTable::graded(geometry, AXIS_X, OFFSET_E, dt, dx, e0, constants, numerics)?,
            chzx: PmlTable::graded(geometry, AXIS_X, OFFSET_H, dt, dx, m0, constants, numerics)?,
            chzy: PmlTable::graded(geometry, AXIS_Y, OFFSET_H, dt, dy, m0, constants, numerics)?,
            rer,
            whole: *geometry.whole(),
            ex_rects: active_rectangles(Component::Ex, geometry),
            ey_rects: active_rectangles(Component::Ey, geometry),
            hz_rects: active_rectangles(Component::Hz, geometry),
        })
    }

    /// Rectangles updated for `component`
    pub fn rectangles(&self, component: Component) -> &[PmlRect] {
        match component {
            Component::Ex => &self.ex_rects,
            Component::Ey => &self.ey_rects,
            Component::Hz => &self.hz_rects,
        }
    }

    /// Advance `exy`/`eyx` in the margin and copy them into Ex/Ey
    pub fn correct_e(&self, fields: &mut FieldState) {
        let FieldState {
            ex, ey, hz, exy, eyx, ..
        } = fields;
        self.correct_ex(hz, ex, exy);
        self.correct_ey(hz, ey, eyx);
    }

    /// Advance `hzx`/`hzy` in the margin and sum them into Hz
    pub fn correct_h(&self, fields: &mut FieldState) {
        let FieldState {
            ex, ey, hz, hzx, hzy, ..
        } = fields;
        self.correct_hz(ey, ex, hz, hzx, hzy);
    }

    fn correct_ex(&self, hz: &FieldData, ex: &mut FieldData, exy: &mut FieldData) {
        let lnx = self.whole.length[0];
        let [bw0, bw1] = self.whole.begin;
        let (cs, csl) = (&self.cexy.cs, &self.cexy.csl);
        let rer = &self.rer.rer_ex.data;
        let hz = &hz.data;

        for rect in &self.ex_rects {
            for j in rect.j[0]..rect.j[1] {
                let jj = (j - bw1) as usize;
                for i in rect.i[0]..rect.i[1] {
                    let ii = (i - bw0) as usize;
                    let ix = jj * lnx + ii;
                    let jm = ix - lnx;
                    exy.data[ix] = cs[jj] * exy.data[ix] + rer[ix] * csl[jj] * (hz[ix] - hz[jm]);
                    ex.data[ix] = exy.data[ix];
                }
            }
        }
    }

    fn correct_ey(&self, hz: &FieldData, ey: &mut FieldData, eyx: &mut FieldData) {
        let lnx = self.whole.length[0];
        let [bw0, bw1] = self.whole.begin;
        let (cs, csl) = (&self.ceyx.cs, &self.ceyx.csl);
        let rer = &self.rer.rer_ey.data;
        let hz = &hz.data;

        for rect in &self.ey_rects {
            for j in rect.j[0]..rect.j[1] {
                let jj = (j - bw1) as usize;
                for i in rect.i[0]..rect.i[1] {
                    let ii = (i - bw0) as usize;
                    let ix = jj * lnx + ii;
                    let im = ix - 1;
                    eyx.data[ix] = cs[ii] * eyx.data[ix] - rer[ix] * csl[ii] * (hz[ix] - hz[im]);
                    ey.data[ix] = eyx.data[ix];
                }
            }
        }
    }

    fn correct_hz(
        &self,
        ey: &FieldData,
        ex: &FieldData,
        hz: &mut FieldData,
        hzx: &mut FieldData,
        hzy: &mut FieldData,
    ) {
        let lnx = self.whole.length[0];
        let [bw0, bw1] = self.whole.begin;
        let (csx, cslx) = (&self.chzx.cs, &self.chzx.csl);
        let (csy, csly) = (&self.chzy.cs, &self.chzy.csl);
        let (ex, ey) = (&ex.data, &ey.data);

        for rect in &self.hz_rects {
            for j in rect.j[0]..rect.j[1] {
                let jj = (j - bw1) as usize;
                for i in rect.i[0]..rect.i[1] {
                    let ii = (i - bw0) as usize;
                    let ix = jj * lnx + ii;
                    let ip = ix + 1;
                    let jp = ix + lnx;
                    hzx.data[ix] = csx[ii] * hzx.data[ix] - cslx[ii] * (ey[ip] - ey[ix]);
                    hzy.data[ix] = csy[jj] * hzy.data[ix] + csly[jj] * (ex[jp] - ex[ix]);
                    hz.data[ix] = hzx.data[ix] + hzy.data[ix];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::solver::material::MaterialField;

    fn table(geometry: &GridGeometry, axis: usize, offset: usize) -> PmlTable {
        let cfg = SimulationConfig::default();
        let k = cfg.constants;
        let em0 = if offset == OFFSET_E { k.eps0 } else { k.mu0 };
        PmlTable::graded(geometry, axis, offset, cfg.dt(), cfg.numerics.dx, em0, &k, &cfg.numerics)
            .unwrap()
    }

    #[test]
    fn test_decay_factor_bounds() {
        let g = GridGeometry::new(20, 20, 1, 0, 8).unwrap();
        for axis in 0..2 {
            for offset in [OFFSET_E, OFFSET_H] {
                let t = table(&g, axis, offset);
                assert_eq!(t.cs.len(), 37);
                for &cs in &t.cs {
                    assert!(cs > 0.0 && cs <= 1.0, "cs = {cs} out of (0, 1]");
                }
            }
        }
    }

    #[test]
    fn test_no_damping_inside() {
        let g = GridGeometry::new(20, 12, 1, 0, 8).unwrap();
        let whole = g.whole();
        for (axis, n) in [(0, 20_isize), (1, 12)] {
            // Electric: [begin, end] is undamped
            let e = table(&g, axis, OFFSET_E);
            for i in 0..=n {
                assert_eq!(e.cs[(i - whole.begin[axis]) as usize], 1.0);
            }
            // Magnetic: [begin, end - 1] is undamped
            let h = table(&g, axis, OFFSET_H);
            for i in 0..n {
                assert_eq!(h.cs[(i - whole.begin[axis]) as usize], 1.0);
            }
        }
    }

    #[test]
    fn test_decay_strictly_decreases_with_depth() {
        let g = GridGeometry::new(16, 16, 1, 0, 8).unwrap();
        let mgn = 8;
        for offset in [OFFSET_E, OFFSET_H] {
            let t = table(&g, 1, offset);
            // Lower margin: local 0..mgn, deeper toward index 0
            for ii in 0..mgn {
                assert!(t.cs[ii] < t.cs[ii + 1], "lower margin not graded at {ii}");
            }
            // Upper margin: deeper toward the last index
            let first_damped = mgn + 16 + 1 - offset;
            for ii in first_damped..t.cs.len() - 1 {
                assert!(t.cs[ii] > t.cs[ii + 1], "upper margin not graded at {ii}");
            }
            assert!(t.cs[first_damped] < 1.0);
            assert_eq!(t.cs[first_damped - 1], 1.0);
        }
    }

    #[test]
    fn test_loss_factor_inside_equals_vacuum_coefficient() {
        let g = GridGeometry::new(8, 8, 1, 0, 8).unwrap();
        let cfg = SimulationConfig::default();
        let t = table(&g, 0, OFFSET_E);
        let expected = cfg.dt() / (cfg.constants.eps0 * cfg.numerics.dx);
        approx::assert_relative_eq!(t.csl[12], expected, max_relative = 1e-14);
    }

    #[test]
    fn test_seam_is_not_absorbing() {
        // Upper rank of two: its lower margin lies inside the global region
        let g = GridGeometry::new(16, 16, 2, 1, 8).unwrap();
        for offset in [OFFSET_E, OFFSET_H] {
            let t = table(&g, 1, offset);
            for ii in 0..=8 {
                assert_eq!(t.cs[ii], 1.0);
            }
        }
    }

    /// Coverage count of every whole cell by the inside block plus the margin
    /// rectangles of `component`
    fn coverage(component: Component, g: &GridGeometry, interior: PmlRect) -> Vec<u32> {
        let whole = g.whole();
        let mut count = vec![0_u32; whole.cells()];
        let mut rects = active_rectangles(component, g);
        rects.push(interior);
        for rect in rects {
            for j in rect.j[0]..rect.j[1] {
                for i in rect.i[0]..rect.i[1] {
                    count[g.global_index(i, j)] += 1;
                }
            }
        }
        count
    }

    #[test]
    fn test_rectangles_partition_ex() {
        let g = GridGeometry::new(10, 6, 1, 0, 3).unwrap();
        let (nx, ny) = (10, 6);
        // Interior Ex block: ny + 1 rows x nx columns
        let interior = PmlRect { side: Side::Left, i: [0, nx], j: [0, ny + 1] };
        let count = coverage(Component::Ex, &g, interior);
        let whole = g.whole();
        for jj in 0..whole.length[1] {
            for ii in 0..whole.length[0] {
                let expected = u32::from(jj != 0);
                assert_eq!(count[g.index(ii, jj)], expected, "Ex cell ({ii}, {jj})");
            }
        }
    }

    #[test]
    fn test_rectangles_partition_ey() {
        let g = GridGeometry::new(10, 6, 1, 0, 3).unwrap();
        let interior = PmlRect { side: Side::Left, i: [0, 11], j: [0, 6] };
        let count = coverage(Component::Ey, &g, interior);
        let whole = g.whole();
        for jj in 0..whole.length[1] {
            for ii in 0..whole.length[0] {
                let expected = u32::from(ii != 0);
                assert_eq!(count[g.index(ii, jj)], expected, "Ey cell ({ii}, {jj})");
            }
        }
    }

    #[test]
    fn test_rectangles_partition_hz() {
        let g = GridGeometry::new(10, 6, 1, 0, 3).unwrap();
        let interior = PmlRect { side: Side::Left, i: [0, 10], j: [0, 6] };
        let count = coverage(Component::Hz, &g, interior);
        let whole = g.whole();
        for jj in 0..whole.length[1] {
            for ii in 0..whole.length[0] {
                let edge = ii == whole.length[0] - 1 || jj == whole.length[1] - 1;
                assert_eq!(count[g.index(ii, jj)], u32::from(!edge), "Hz cell ({ii}, {jj})");
            }
        }
    }

    #[test]
    fn test_corners_belong_to_horizontal_strips() {
        let g = GridGeometry::new(10, 6, 1, 0, 3).unwrap();
        for component in [Component::Ex, Component::Ey, Component::Hz] {
            let rects = margin_rectangles(component, g.whole(), g.inside());
            // Bottom-left and top-right corner cells
            for (i, j) in [(-2, -2), (11, 8)] {
                let owners: Vec<Side> = rects
                    .iter()
                    .filter(|r| r.contains(i, j))
                    .map(|r| r.side)
                    .collect();
                assert_eq!(owners.len(), 1, "{component:?} corner ({i}, {j})");
                assert!(matches!(owners[0], Side::Bottom | Side::Top));
            }
            // Side strips start at the first inside row, leaving corners to the horizontal strips
            for r in rects.iter().filter(|r| matches!(r.side, Side::Left | Side::Right)) {
                assert_eq!(r.j[0], g.inside().begin[1], "{component:?} {:?}", r.side);
                assert!(r.j[1] <= g.inside().end(1) + 1);
            }
        }
    }

    #[test]
    fn test_interior_rank_has_only_side_strips() {
        let parts = GridGeometry::partition(8, 12, 3, 4).unwrap();
        let middle = &parts[1];
        let ex = active_rectangles(Component::Ex, middle);
        assert_eq!(ex.len(), 2);
        for rect in &ex {
            assert_eq!(rect.j, [4, 8]);
        }
        let top = active_rectangles(Component::Ex, &parts[2]);
        assert_eq!(top.len(), 3);
        assert!(top.iter().any(|r| r.side == Side::Top));
        let bottom = active_rectangles(Component::Hz, &parts[0]);
        assert!(bottom.iter().any(|r| r.side == Side::Bottom));
        assert!(!bottom.iter().any(|r| r.side == Side::Top));
    }

    #[test]
    fn test_margin_decays_without_input() {
        let g = GridGeometry::new(8, 8, 1, 0, 8).unwrap();
        let cfg = SimulationConfig::default();
        let m = MaterialField::uniform(&g, 1.0).unwrap();
        let rer = PmlPermittivity::new(&g, &m).unwrap();
        let pml = PmlBoundary::new(&g, rer, cfg.dt(), &cfg.constants, &cfg.numerics).unwrap();

        let mut fields = FieldState::new(&g).unwrap();
        let corner = g.index(1, 1);
        fields.hzx.data[corner] = 1.0;
        fields.hzy.data[corner] = 1.0;
        for _ in 0..10 {
            pml.correct_h(&mut fields);
        }
        let hz = fields.hz.data[corner];
        assert!(hz > 0.0 && hz < 2.0, "corner Hz should decay, got {hz}");
    }
}
