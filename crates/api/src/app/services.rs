//! Notes service. Each operation validates its input, then runs in exactly
//! one DAO scope.

use groundwork_core::{query_args, Error};
use groundwork_infra::{Repo, Scalar, Scope};
use groundwork_observability::Layer;

use crate::app::dto::{CreateNoteRequest, Note};

const MAX_BODY_LEN: usize = 2000;

pub async fn create_note(
    repo: &Repo,
    scope: &Scope,
    input: CreateNoteRequest,
) -> Result<Note, Error> {
    let logger = scope.logger().function(Layer::Service, "create_note");

    let body = input.body.trim().to_string();
    if body.is_empty() {
        return Err(Error::new_input("note body must not be empty"));
    }
    if body.chars().count() > MAX_BODY_LEN {
        return Err(Error::new_input(format!(
            "note body must be at most {MAX_BODY_LEN} characters"
        )));
    }

    let note = repo
        .serializable_tx(&scope.with_logger(logger.clone()), |dao| async move {
            let insert = dao.rebind("INSERT INTO notes (body) VALUES (?) RETURNING id, body");
            dao.get::<Note>(&insert, &query_args![body]).await
        })
        .await?;

    logger.returned(Layer::Service);
    Ok(note)
}

pub async fn list_notes(repo: &Repo, scope: &Scope) -> Result<Vec<Note>, Error> {
    let logger = scope.logger().function(Layer::Service, "list_notes");
    let notes = repo
        .non_tx(&scope.with_logger(logger.clone()))
        .select::<Note>("SELECT id, body FROM notes ORDER BY id", &[])
        .await?;
    logger.returned(Layer::Service);
    Ok(notes)
}

/// Delete a note. Deleting a note that does not exist is an input error.
pub async fn delete_note(repo: &Repo, scope: &Scope, id: i64) -> Result<(), Error> {
    let logger = scope.logger().function(Layer::Service, "delete_note");

    repo.serializable_tx(&scope.with_logger(logger.clone()), |dao| async move {
        let delete = dao.rebind("DELETE FROM notes WHERE id = ?");
        let done = dao.exec(&delete, &query_args![id]).await?;
        if done.rows_affected == 0 {
            return Err(Error::new_input(format!("note {id} does not exist")));
        }
        Ok(())
    })
    .await?;

    logger.returned(Layer::Service);
    Ok(())
}

/// Round-trip to the database.
pub async fn ping(repo: &Repo, scope: &Scope) -> Result<(), Error> {
    let Scalar(one) = repo
        .non_tx(scope)
        .get::<Scalar<i64>>("SELECT CAST(1 AS BIGINT)", &[])
        .await?;
    if one != 1 {
        return Err(Error::new(format!("database ping returned {one}")));
    }
    Ok(())
}
