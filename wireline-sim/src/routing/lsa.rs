//! Link-state advertisements and their link records.
//!
//! Modeled on the OSPF router-LSA (RFC 2328, Appendix A). Because the
//! database is assembled globally from a static snapshot there is no age
//! or sequence number; an advertisement is a header plus link records.

use std::net::Ipv4Addr;

use wireline_core::RouterId;

/// The kind of link a record represents.
///
/// Values follow the OSPF spec; only point-to-point and stub-network
/// records are produced today, the rest are reserved for compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkType {
    /// Uninitialized link record.
    #[default]
    Unknown,
    /// A point-to-point connection to another router.
    PointToPoint,
    /// Reserved for future OSPF compatibility.
    TransitNetwork,
    /// A leaf network with no routing peer of its own.
    StubNetwork,
    /// Reserved for future OSPF compatibility.
    VirtualLink,
}

/// A single link record inside a router advertisement.
///
/// The meaning of `link_id` and `link_data` depends on the link type,
/// per RFC 2328:
///
/// | type | `link_id` | `link_data` |
/// |------|-----------|-------------|
/// | point-to-point | neighbor router ID | local interface address |
/// | stub network | network address | network mask |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRecord {
    /// The kind of link this record represents.
    pub link_type: LinkType,
    /// Neighbor router ID or network address, by type.
    pub link_id: Ipv4Addr,
    /// Local interface address or network mask, by type.
    pub link_data: Ipv4Addr,
    /// Cost of crossing this link; sums along a path.
    pub metric: u32,
}

impl LinkRecord {
    /// Create an initialized link record.
    pub fn new(link_type: LinkType, link_id: Ipv4Addr, link_data: Ipv4Addr, metric: u32) -> Self {
        Self {
            link_type,
            link_id,
            link_data,
            metric,
        }
    }
}

impl Default for LinkRecord {
    fn default() -> Self {
        Self {
            link_type: LinkType::Unknown,
            link_id: Ipv4Addr::UNSPECIFIED,
            link_data: Ipv4Addr::UNSPECIFIED,
            metric: 0,
        }
    }
}

/// Position of a vertex during the shortest-path computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpfStatus {
    /// New vertex, not yet considered.
    #[default]
    NotExplored,
    /// Vertex is in the candidate list.
    Candidate,
    /// Vertex has its final position in the shortest-path tree.
    InSpfTree,
}

/// A router link-state advertisement.
///
/// Both the link-state ID and the advertising router are the emitting
/// router's ID. One advertisement exists per router; it carries one
/// point-to-point record per up adjacency plus one stub record per
/// configured interface subnet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterLsa {
    /// Tristate flag used by the shortest-path computation.
    pub status: SpfStatus,
    /// The link-state ID; always the emitting router's ID.
    pub link_state_id: RouterId,
    /// The advertising router; always the emitting router's ID.
    pub advertising_router: RouterId,
    records: Vec<LinkRecord>,
}

impl RouterLsa {
    /// Create an advertisement with an empty record list.
    pub fn new(status: SpfStatus, link_state_id: RouterId, advertising_router: RouterId) -> Self {
        Self {
            status,
            link_state_id,
            advertising_router,
            records: Vec::new(),
        }
    }

    /// Append a link record, returning the new record count.
    pub fn add_link_record(&mut self, record: LinkRecord) -> usize {
        self.records.push(record);
        self.records.len()
    }

    /// The number of link records in the advertisement.
    pub fn num_link_records(&self) -> usize {
        self.records.len()
    }

    /// The `n`-th link record, in insertion order.
    pub fn link_record(&self, n: usize) -> Option<&LinkRecord> {
        self.records.get(n)
    }

    /// All link records, in insertion order.
    pub fn link_records(&self) -> &[LinkRecord] {
        &self.records
    }

    /// Drop every link record.
    pub fn clear_link_records(&mut self) {
        self.records.clear();
    }

    /// True if the advertisement has no link records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The point-to-point records of this advertisement.
    pub fn point_to_point_records(&self) -> impl Iterator<Item = &LinkRecord> {
        self.records
            .iter()
            .filter(|record| record.link_type == LinkType::PointToPoint)
    }

    /// The stub-network records of this advertisement.
    pub fn stub_records(&self) -> impl Iterator<Item = &LinkRecord> {
        self.records
            .iter()
            .filter(|record| record.link_type == LinkType::StubNetwork)
    }

    /// True if this router advertises a point-to-point link toward `neighbor`.
    ///
    /// This is the reverse half of the two-way check: an edge enters the
    /// shortest-path graph only when both endpoints advertise each other.
    pub fn has_point_to_point_to(&self, neighbor: Ipv4Addr) -> bool {
        self.point_to_point_records()
            .any(|record| record.link_id == neighbor)
    }
}

impl std::fmt::Display for RouterLsa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "LSA id={} adv={} ({} records)",
            self.link_state_id,
            self.advertising_router,
            self.records.len()
        )?;
        for record in &self.records {
            writeln!(
                f,
                "  {:?} id={} data={} metric={}",
                record.link_type, record.link_id, record.link_data, record.metric
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lsa() -> RouterLsa {
        let mut lsa = RouterLsa::new(SpfStatus::NotExplored, RouterId::from(1), RouterId::from(1));
        lsa.add_link_record(LinkRecord::new(
            LinkType::PointToPoint,
            Ipv4Addr::new(0, 0, 0, 2),
            Ipv4Addr::new(10, 1, 1, 1),
            1,
        ));
        lsa.add_link_record(LinkRecord::new(
            LinkType::StubNetwork,
            Ipv4Addr::new(10, 1, 1, 0),
            Ipv4Addr::new(255, 255, 255, 0),
            1,
        ));
        lsa
    }

    #[test]
    fn test_record_accounting() {
        let mut lsa = sample_lsa();
        assert_eq!(lsa.num_link_records(), 2);
        assert!(!lsa.is_empty());
        assert_eq!(lsa.point_to_point_records().count(), 1);
        assert_eq!(lsa.stub_records().count(), 1);
        assert!(lsa.link_record(0).is_some());
        assert!(lsa.link_record(2).is_none());

        lsa.clear_link_records();
        assert!(lsa.is_empty());
    }

    #[test]
    fn test_two_way_predicate() {
        let lsa = sample_lsa();
        assert!(lsa.has_point_to_point_to(Ipv4Addr::new(0, 0, 0, 2)));
        assert!(!lsa.has_point_to_point_to(Ipv4Addr::new(0, 0, 0, 3)));
    }

    #[test]
    fn test_display_lists_records() {
        let rendered = sample_lsa().to_string();
        assert!(rendered.contains("id=0.0.0.1"));
        assert!(rendered.contains("PointToPoint"));
        assert!(rendered.contains("StubNetwork"));
    }
}
