//! Halo exchange between vertically adjacent subdomains
//!
//! Ranks are stacked along axis 1. Every iteration moves two rows across
//! each seam:
//!
//! - the last inside row of Hz goes up into the lower halo row of the rank
//!   above, before that rank's E update reads it
//! - the first inside row of Ex goes down into the upper halo row of the rank
//!   below, before that rank's H update reads it
//!
//! [`NoExchange`] serves single-rank runs. [`ChannelExchange`] connects ranks
//! running on separate threads through unbounded `mpsc` channels: every rank
//! sends before it receives, so a shift can never deadlock.

use crate::error::{FdtdError, FdtdResult};
use crate::grid::GridGeometry;
use crate::solver::fields::FieldData;
use std::sync::mpsc::{self, Receiver, Sender};

/// Point-to-point row transport between neighboring ranks
pub trait HaloExchange: Send {
    /// Send `row` to the rank above and return the row sent by the rank below
    ///
    /// Returns `Ok(None)` at the bottom of the domain.
    fn shift_up(&mut self, row: &[f64]) -> FdtdResult<Option<Vec<f64>>>;

    /// Send `row` to the rank below and return the row sent by the rank above
    ///
    /// Returns `Ok(None)` at the top of the domain.
    fn shift_down(&mut self, row: &[f64]) -> FdtdResult<Option<Vec<f64>>>;
}

/// Exchange for a domain with a single rank
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExchange;

impl HaloExchange for NoExchange {
    fn shift_up(&mut self, _row: &[f64]) -> FdtdResult<Option<Vec<f64>>> {
        Ok(None)
    }

    fn shift_down(&mut self, _row: &[f64]) -> FdtdResult<Option<Vec<f64>>> {
        Ok(None)
    }
}

/// Channel endpoints of one rank in a vertical chain
#[derive(Debug)]
pub struct ChannelExchange {
    rank: usize,
    up: Option<Sender<Vec<f64>>>,
    from_below: Option<Receiver<Vec<f64>>>,
    down: Option<Sender<Vec<f64>>>,
    from_above: Option<Receiver<Vec<f64>>>,
}

impl ChannelExchange {
    /// Connected endpoints for ranks `0..nsubdomains`, in rank order
    pub fn chain(nsubdomains: usize) -> Vec<Self> {
        let mut links: Vec<Self> = (0..nsubdomains)
            .map(|rank| Self {
                rank,
                up: None,
                from_below: None,
                down: None,
                from_above: None,
            })
            .collect();

        for lower in 0..nsubdomains.saturating_sub(1) {
            let (up_tx, up_rx) = mpsc::channel();
            let (down_tx, down_rx) = mpsc::channel();
            links[lower].up = Some(up_tx);
            links[lower].from_above = Some(down_rx);
            links[lower + 1].from_below = Some(up_rx);
            links[lower + 1].down = Some(down_tx);
        }

        links
    }

    /// Rank this endpoint belongs to
    pub fn rank(&self) -> usize {
        self.rank
    }

    fn send(&self, tx: Option<&Sender<Vec<f64>>>, row: &[f64], to: &str) -> FdtdResult<()> {
        if let Some(tx) = tx {
            tx.send(row.to_vec())
                .map_err(|_| FdtdError::exchange(self.rank, format!("rank {to} hung up")))?;
        }
        Ok(())
    }

    fn recv(&self, rx: Option<&Receiver<Vec<f64>>>, from: &str) -> FdtdResult<Option<Vec<f64>>> {
        rx.map(|rx| {
            rx.recv()
                .map_err(|_| FdtdError::exchange(self.rank, format!("rank {from} hung up")))
        })
        .transpose()
    }
}

impl HaloExchange for ChannelExchange {
    fn shift_up(&mut self, row: &[f64]) -> FdtdResult<Option<Vec<f64>>> {
        self.send(self.up.as_ref(), row, "above")?;
        self.recv(self.from_below.as_ref(), "below")
    }

    fn shift_down(&mut self, row: &[f64]) -> FdtdResult<Option<Vec<f64>>> {
        self.send(self.down.as_ref(), row, "below")?;
        self.recv(self.from_above.as_ref(), "above")
    }
}

fn store_row(geometry: &GridGeometry, field: &mut FieldData, jj: usize, row: &[f64]) -> FdtdResult<()> {
    if row.len() != field.width {
        return Err(FdtdError::exchange(
            geometry.rank(),
            format!("received row of {} cells, expected {}", row.len(), field.width),
        ));
    }
    field.row_mut(jj).copy_from_slice(row);
    Ok(())
}

/// Send the last inside Hz row up; fill the lower halo row from below
pub fn exchange_hz(
    geometry: &GridGeometry,
    hz: &mut FieldData,
    exchange: &mut dyn HaloExchange,
) -> FdtdResult<()> {
    if let Some(row) = exchange.shift_up(hz.row(geometry.last_inside_row()))? {
        store_row(geometry, hz, geometry.lower_halo_row(), &row)?;
    }
    Ok(())
}

/// Send the first inside Ex row down; fill the upper halo row from above
pub fn exchange_ex(
    geometry: &GridGeometry,
    ex: &mut FieldData,
    exchange: &mut dyn HaloExchange,
) -> FdtdResult<()> {
    if let Some(row) = exchange.shift_down(ex.row(geometry.first_inside_row()))? {
        store_row(geometry, ex, geometry.upper_halo_row(), &row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_no_exchange_receives_nothing() {
        let mut x = NoExchange;
        assert_eq!(x.shift_up(&[1.0, 2.0]).unwrap(), None);
        assert_eq!(x.shift_down(&[1.0, 2.0]).unwrap(), None);
    }

    #[test]
    fn test_chain_ends_are_open() {
        let mut links = ChannelExchange::chain(1);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].shift_up(&[1.0]).unwrap(), None);
        assert_eq!(links[0].shift_down(&[1.0]).unwrap(), None);
    }

    #[test]
    fn test_rows_cross_seams_between_threads() {
        let parts = GridGeometry::partition(4, 6, 3, 2).unwrap();
        let links = ChannelExchange::chain(3);

        let results: Vec<(FieldData, FieldData)> = thread::scope(|s| {
            let handles: Vec<_> = parts
                .iter()
                .zip(links)
                .map(|(g, mut link)| {
                    s.spawn(move || {
                        let rank = g.rank() as f64;
                        let mut hz = FieldData::for_geometry(g).unwrap();
                        let mut ex = FieldData::for_geometry(g).unwrap();
                        hz.row_mut(g.last_inside_row()).fill(10.0 + rank);
                        ex.row_mut(g.first_inside_row()).fill(20.0 + rank);
                        exchange_hz(g, &mut hz, &mut link).unwrap();
                        exchange_ex(g, &mut ex, &mut link).unwrap();
                        (hz, ex)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for (rank, (g, (hz, ex))) in parts.iter().zip(&results).enumerate() {
            let below = hz.row(g.lower_halo_row());
            let above = ex.row(g.upper_halo_row());
            if rank == 0 {
                assert!(below.iter().all(|&v| v == 0.0));
            } else {
                assert!(below.iter().all(|&v| v == 10.0 + (rank - 1) as f64));
            }
            if rank == 2 {
                assert!(above.iter().all(|&v| v == 0.0));
            } else {
                assert!(above.iter().all(|&v| v == 20.0 + (rank + 1) as f64));
            }
        }
    }

    #[test]
    fn test_hung_up_neighbor_is_exchange_error() {
        let mut links = ChannelExchange::chain(2);
        let upper = links.pop().unwrap();
        drop(upper);
        let err = links[0].shift_up(&[1.0]).unwrap_err();
        assert!(matches!(err, FdtdError::Exchange { rank: 0, .. }));
    }

    #[test]
    fn test_short_row_is_rejected() {
        let g = GridGeometry::new(4, 4, 2, 1, 2).unwrap();
        let mut hz = FieldData::for_geometry(&g).unwrap();

        struct Short;
        impl HaloExchange for Short {
            fn shift_up(&mut self, _row: &[f64]) -> FdtdResult<Option<Vec<f64>>> {
                Ok(Some(vec![1.0; 3]))
            }
            fn shift_down(&mut self, _row: &[f64]) -> FdtdResult<Option<Vec<f64>>> {
                Ok(None)
            }
        }

        let err = exchange_hz(&g, &mut hz, &mut Short).unwrap_err();
        assert!(matches!(err, FdtdError::Exchange { rank: 1, .. }));
    }
}
