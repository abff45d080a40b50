//! Repository call helpers shared by the use cases: per-call timeouts and the
//! reload-and-reapply loop used to resolve optimistic concurrency conflicts.

use std::{future::Future, time::Duration};

use custodian_core::{AccountRepository, InfrastructureError, RepositoryError, UserAccount};

use crate::policy::AccountPolicy;

/// Bound a repository call; an elapsed deadline becomes `RepositoryError::Timeout`.
pub async fn with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(RepositoryError::Timeout(timeout)),
    }
}

/// Apply `mutation` to `account` and persist it.
///
/// When the save loses a version race the account is reloaded by id and the
/// mutation applied again to the fresh copy, at most
/// `policy.max_conflict_retries` times. The mutation may veto a retry by
/// returning an error, which is passed through unchanged.
pub async fn save_with_retry<R, E, F>(
    repository: &R,
    policy: &AccountPolicy,
    mut account: UserAccount,
    mut mutation: F,
) -> Result<UserAccount, E>
where
    R: AccountRepository + ?Sized,
    E: From<RepositoryError> + From<InfrastructureError>,
    F: FnMut(&mut UserAccount) -> Result<(), E>,
{
    mutation(&mut account)?;

    let mut conflicts = 0;
    loop {
        let id = account.id();
        match with_timeout(policy.repository_timeout, repository.save(account)).await {
            Ok(saved) => return Ok(saved),
            Err(RepositoryError::VersionConflict { expected, .. }) => {
                conflicts += 1;
                if conflicts > policy.max_conflict_retries {
                    tracing::error!(account_id = %id, conflicts, "Giving up on conflicting update");
                    return Err(InfrastructureError::ConcurrentModification {
                        attempts: conflicts,
                    }
                    .into());
                }
                tracing::debug!(account_id = %id, expected, conflicts, "Version conflict, reloading");

                account = with_timeout(policy.repository_timeout, repository.find_by_id(&id))
                    .await?
                    .ok_or_else(|| {
                        RepositoryError::Unexpected(format!(
                            "account {id} disappeared during a conflicting update"
                        ))
                    })?;
                mutation(&mut account)?;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockAccountRepository, sample_account};

    #[derive(Debug)]
    enum TestError {
        Repository(RepositoryError),
        Infrastructure(InfrastructureError),
    }

    impl From<RepositoryError> for TestError {
        fn from(e: RepositoryError) -> Self {
            Self::Repository(e)
        }
    }

    impl From<InfrastructureError> for TestError {
        fn from(e: InfrastructureError) -> Self {
            Self::Infrastructure(e)
        }
    }

    #[tokio::test]
    async fn conflicts_are_retried_against_a_fresh_copy() {
        let repository = MockAccountRepository::default();
        let stored = repository.insert(sample_account()).await;
        repository.inject_conflicts(3);

        let mut applied = 0;
        let saved = save_with_retry(
            &repository,
            &AccountPolicy::default(),
            stored,
            |account: &mut UserAccount| -> Result<(), TestError> {
                applied += 1;
                account.record_failed_login(5, chrono::Duration::minutes(15));
                Ok(())
            },
        )
        .await
        .unwrap();

        assert_eq!(applied, 4);
        assert_eq!(saved.failed_login_attempts(), 1);
        assert_eq!(saved.version(), 2);
    }

    #[tokio::test]
    async fn too_many_conflicts_give_up() {
        let repository = MockAccountRepository::default();
        let stored = repository.insert(sample_account()).await;
        repository.inject_conflicts(100);
        let policy = AccountPolicy {
            max_conflict_retries: 2,
            ..AccountPolicy::default()
        };

        let result = save_with_retry(
            &repository,
            &policy,
            stored,
            |_: &mut UserAccount| -> Result<(), TestError> { Ok(()) },
        )
        .await;

        assert!(matches!(
            result,
            Err(TestError::Infrastructure(
                InfrastructureError::ConcurrentModification { attempts: 3 }
            ))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, RepositoryError>(())
        })
        .await;

        assert_eq!(result, Err(RepositoryError::Timeout(Duration::from_millis(10))));
    }
}
