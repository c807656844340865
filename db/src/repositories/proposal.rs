use crate::models::proposal::{NewProposal, Proposal, UpdateProposal};
use crate::repositories::ProposalRepository;
use crate::{get_connection, DbPool};

use diesel::prelude::*;

pub struct ProposalRepositoryImpl {
    db_pool: DbPool,
}

impl ProposalRepositoryImpl {
    pub fn new(db_pool: DbPool) -> Self {
        ProposalRepositoryImpl { db_pool }
    }
}

impl ProposalRepository for ProposalRepositoryImpl {
    fn create(&self, conn: &mut PgConnection, proposal: &NewProposal) -> QueryResult<bool> {
        use crate::schema::proposals::dsl::*;

        let inserted_rows = diesel::insert_into(proposals)
            .values(proposal)
            .on_conflict(trace_id)
            .do_nothing()
            .execute(conn)?;

        Ok(inserted_rows > 0)
    }

    fn update_if_version(
        &self,
        conn: &mut PgConnection,
        trace_id_str: &str,
        proposal: &UpdateProposal,
        expected_version: i64,
    ) -> QueryResult<bool> {
        use crate::schema::proposals::dsl::*;

        let updated_rows = diesel::update(
            proposals
                .filter(trace_id.eq(trace_id_str))
                .filter(version.eq(expected_version)),
        )
        .set(proposal)
        .execute(conn)?;

        Ok(updated_rows > 0)
    }

    fn find_by_trace_id(&self, trace_id_str: &str) -> QueryResult<Option<Proposal>> {
        use crate::schema::proposals::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        proposals
            .filter(trace_id.eq(trace_id_str))
            .first(&mut conn)
            .optional()
    }
}
