use std::sync::Arc;

use argon2::Params;
use custodian_adapters::{
    Argon2PasswordHasher, HashMapAccountRepository, HashMapVerificationTokenStore,
    InMemoryEventBus, JwtTokenIssuer, MockNotificationService,
};
use custodian_application::{AccountPolicy, CreateAccountError, LoginError};
use custodian_core::{
    ACCOUNT_CREATED, AccountRepository, ConflictError, EmailAddress, InvalidCredentialsError,
};
use custodian_service::AccountService;
use secrecy::Secret;

const PASSWORD: &str = "Password123!";
const TASKS: usize = 8;

type Service = AccountService<
    HashMapAccountRepository,
    Argon2PasswordHasher,
    MockNotificationService,
    InMemoryEventBus,
    JwtTokenIssuer,
    HashMapVerificationTokenStore,
>;

fn build(policy: AccountPolicy) -> (Arc<Service>, HashMapAccountRepository, InMemoryEventBus) {
    let repository = HashMapAccountRepository::new();
    let bus = InMemoryEventBus::new();
    let service = AccountService::new(
        repository.clone(),
        Argon2PasswordHasher::with_params(Params::new(8, 1, 1, None).unwrap(), 8),
        MockNotificationService::new(),
        bus.clone(),
        JwtTokenIssuer::new(Secret::new("concurrency-secret".to_string()), 60),
        HashMapVerificationTokenStore::new(),
        policy,
    );
    (Arc::new(service), repository, bus)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_create_one_account() {
    let (service, repository, bus) = build(AccountPolicy::default());

    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .register("race@example.com", Secret::new(PASSWORD.to_string()), None)
                    .await
            })
        })
        .collect();

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(CreateAccountError::Conflict(ConflictError::EmailAlreadyExists(_))) => {
                conflicts += 1
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, TASKS - 1);
    assert_eq!(repository.len().await, 1);

    let created_events = bus
        .published()
        .await
        .iter()
        .filter(|e| e.event_type() == ACCOUNT_CREATED)
        .count();
    assert_eq!(created_events, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_failures_are_all_counted() {
    let (service, repository, _) = build(AccountPolicy {
        max_login_attempts: 100,
        require_email_verification: false,
        ..AccountPolicy::default()
    });
    service
        .register("busy@example.com", Secret::new(PASSWORD.to_string()), None)
        .await
        .unwrap();

    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .login("busy@example.com", Secret::new("WrongPass1!".to_string()))
                    .await
            })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap();
        assert!(matches!(
            result,
            Err(LoginError::InvalidCredentials(
                InvalidCredentialsError::InvalidPassword
            ))
        ));
    }

    let stored = repository
        .find_by_email(&EmailAddress::parse("busy@example.com").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.failed_login_attempts(), TASKS as u32);
    assert!(!stored.is_locked());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_failures_lock_exactly_at_threshold() {
    let (service, repository, _) = build(AccountPolicy {
        max_login_attempts: 3,
        require_email_verification: false,
        ..AccountPolicy::default()
    });
    service
        .register("edge@example.com", Secret::new(PASSWORD.to_string()), None)
        .await
        .unwrap();

    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .login("edge@example.com", Secret::new("WrongPass1!".to_string()))
                    .await
            })
        })
        .collect();

    let mut rejected = 0;
    for handle in handles {
        if let Err(LoginError::InvalidCredentials(_)) = handle.await.unwrap() {
            rejected += 1;
        }
    }

    assert_eq!(rejected, TASKS);
    let stored = repository
        .find_by_email(&EmailAddress::parse("edge@example.com").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_locked());
    assert!(stored.failed_login_attempts() >= 3);
}
