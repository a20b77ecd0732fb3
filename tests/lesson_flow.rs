//! End-to-end behavior of the lesson content cache, the completion cache,
//! and the admin invalidation hooks, driven against in-memory stores.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use aula::application::admin::lessons::AdminLessonService;
use aula::application::lessons::LessonService;
use aula::application::render;
use aula::application::repos::{
    CompletedLessonRow, CompletionsRepo, CoursesRepo, CreateCourseParams, CreateLessonParams,
    LessonsRepo, RepoError, UpdateCourseParams, UpdateLessonParams,
};
use aula::cache::{
    CacheConfig, CacheError, CacheHandle, CacheStore, InMemoryCacheStore, keys,
};
use aula::domain::entities::{CourseRecord, LessonCompletionRecord, LessonRecord};
use aula::domain::types::CompletionOutcome;
use aula::infra::uploads::VideoStorage;

// ============================================================================
// In-memory fakes
// ============================================================================

#[derive(Default)]
struct FakeStore {
    courses: Mutex<HashMap<Uuid, CourseRecord>>,
    lessons: Mutex<HashMap<Uuid, LessonRecord>>,
    completions: Mutex<HashSet<(Uuid, Uuid)>>,
}

impl FakeStore {
    fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn add_course(&self, title: &str) -> CourseRecord {
        let course = CourseRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.courses
            .lock()
            .unwrap()
            .insert(course.id, course.clone());
        course
    }

    fn add_lesson(&self, course_id: Uuid, title: &str, markdown: &str) -> LessonRecord {
        let lesson = LessonRecord {
            id: Uuid::new_v4(),
            course_id,
            title: title.to_string(),
            video_path: None,
            text_content: Some(markdown.to_string()),
        };
        self.lessons
            .lock()
            .unwrap()
            .insert(lesson.id, lesson.clone());
        lesson
    }

    fn completion_count(&self) -> usize {
        self.completions.lock().unwrap().len()
    }
}

#[async_trait]
impl CoursesRepo for FakeStore {
    async fn list_courses(&self) -> Result<Vec<CourseRecord>, RepoError> {
        Ok(self.courses.lock().unwrap().values().cloned().collect())
    }

    async fn find_course(&self, id: Uuid) -> Result<Option<CourseRecord>, RepoError> {
        Ok(self.courses.lock().unwrap().get(&id).cloned())
    }

    async fn create_course(&self, params: CreateCourseParams) -> Result<CourseRecord, RepoError> {
        let course = CourseRecord {
            id: Uuid::new_v4(),
            title: params.title,
            description: params.description,
            created_at: OffsetDateTime::now_utc(),
        };
        self.courses
            .lock()
            .unwrap()
            .insert(course.id, course.clone());
        Ok(course)
    }

    async fn update_course(
        &self,
        params: UpdateCourseParams,
    ) -> Result<Option<CourseRecord>, RepoError> {
        let mut courses = self.courses.lock().unwrap();
        Ok(courses.get_mut(&params.id).map(|course| {
            course.title = params.title.clone();
            course.description = params.description.clone();
            course.clone()
        }))
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.courses.lock().unwrap().remove(&id).is_some())
    }
}

#[async_trait]
impl LessonsRepo for FakeStore {
    async fn find_lesson_with_course(
        &self,
        id: Uuid,
    ) -> Result<Option<(LessonRecord, CourseRecord)>, RepoError> {
        let lessons = self.lessons.lock().unwrap();
        let Some(lesson) = lessons.get(&id).cloned() else {
            return Ok(None);
        };
        let courses = self.courses.lock().unwrap();
        let course = courses
            .get(&lesson.course_id)
            .cloned()
            .ok_or_else(|| RepoError::from_persistence("lesson has no parent course"))?;
        Ok(Some((lesson, course)))
    }

    async fn find_lesson(&self, id: Uuid) -> Result<Option<LessonRecord>, RepoError> {
        Ok(self.lessons.lock().unwrap().get(&id).cloned())
    }

    async fn lesson_exists(&self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.lessons.lock().unwrap().contains_key(&id))
    }

    async fn list_lessons_for_course(
        &self,
        course_id: Uuid,
    ) -> Result<Vec<LessonRecord>, RepoError> {
        Ok(self
            .lessons
            .lock()
            .unwrap()
            .values()
            .filter(|lesson| lesson.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn count_lessons(&self) -> Result<u64, RepoError> {
        Ok(self.lessons.lock().unwrap().len() as u64)
    }

    async fn create_lesson(&self, params: CreateLessonParams) -> Result<LessonRecord, RepoError> {
        let lesson = LessonRecord {
            id: Uuid::new_v4(),
            course_id: params.course_id,
            title: params.title,
            video_path: params.video_path,
            text_content: params.text_content,
        };
        self.lessons
            .lock()
            .unwrap()
            .insert(lesson.id, lesson.clone());
        Ok(lesson)
    }

    async fn update_lesson(
        &self,
        params: UpdateLessonParams,
    ) -> Result<Option<LessonRecord>, RepoError> {
        let mut lessons = self.lessons.lock().unwrap();
        Ok(lessons.get_mut(&params.id).map(|lesson| {
            lesson.title = params.title.clone();
            lesson.text_content = params.text_content.clone();
            lesson.video_path = params.video_path.clone();
            lesson.clone()
        }))
    }

    async fn delete_lesson(&self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.lessons.lock().unwrap().remove(&id).is_some())
    }
}

#[async_trait]
impl CompletionsRepo for FakeStore {
    async fn completion_exists(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<bool, RepoError> {
        Ok(self
            .completions
            .lock()
            .unwrap()
            .contains(&(user_id, lesson_id)))
    }

    async fn insert_completion_if_absent(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Option<LessonCompletionRecord>, RepoError> {
        let inserted = self.completions.lock().unwrap().insert((user_id, lesson_id));
        Ok(inserted.then(|| LessonCompletionRecord {
            id: Uuid::new_v4(),
            lesson_id,
            user_id,
            completed_at: OffsetDateTime::now_utc(),
        }))
    }

    async fn delete_completions_for_lesson(&self, lesson_id: Uuid) -> Result<u64, RepoError> {
        let mut completions = self.completions.lock().unwrap();
        let before = completions.len();
        completions.retain(|(_, lesson)| *lesson != lesson_id);
        Ok((before - completions.len()) as u64)
    }

    async fn count_completions_for_user(&self, user_id: Uuid) -> Result<u64, RepoError> {
        Ok(self
            .completions
            .lock()
            .unwrap()
            .iter()
            .filter(|(user, _)| *user == user_id)
            .count() as u64)
    }

    async fn recent_completions_for_user(
        &self,
        _user_id: Uuid,
        _limit: u32,
    ) -> Result<Vec<CompletedLessonRow>, RepoError> {
        Ok(Vec::new())
    }
}

/// A cache store standing in for an unreachable cache host.
struct UnreachableCacheStore;

#[async_trait]
impl CacheStore for UnreachableCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::backend("cache host unreachable"))
    }

    async fn set_with_ttl(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Err(CacheError::backend("cache host unreachable"))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::backend("cache host unreachable"))
    }

    async fn delete_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
        Err(CacheError::backend("cache host unreachable"))
    }
}

// ============================================================================
// Harness
// ============================================================================

fn test_cache_config() -> CacheConfig {
    CacheConfig {
        lesson_ttl: Duration::from_secs(300),
        completion_ttl: Duration::from_secs(120),
        op_timeout: Duration::from_millis(500),
    }
}

fn lesson_service(store: &Arc<FakeStore>, cache: CacheHandle) -> LessonService {
    LessonService::new(
        store.clone(),
        store.clone(),
        render::render_service(),
        cache,
        &test_cache_config(),
    )
}

fn admin_lesson_service(
    store: &Arc<FakeStore>,
    cache: CacheHandle,
    storage: Arc<VideoStorage>,
) -> AdminLessonService {
    AdminLessonService::new(store.clone(), store.clone(), store.clone(), storage, cache)
}

fn temp_storage() -> (tempfile::TempDir, Arc<VideoStorage>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = Arc::new(VideoStorage::new(dir.path().to_path_buf()).expect("storage"));
    (dir, storage)
}

// ============================================================================
// Read path
// ============================================================================

#[tokio::test]
async fn cold_and_warm_reads_agree() {
    let store = FakeStore::shared();
    let cache_store = InMemoryCacheStore::shared();
    let service = lesson_service(&store, CacheHandle::new(cache_store));

    let course = store.add_course("Rust basics");
    let lesson = store.add_lesson(course.id, "Ownership", "# Ownership\n\nMoves and borrows.");

    let cold = service
        .lesson_content(lesson.id)
        .await
        .expect("read succeeds")
        .expect("lesson exists");
    let warm = service
        .lesson_content(lesson.id)
        .await
        .expect("read succeeds")
        .expect("lesson exists");

    assert_eq!(cold, warm);
    assert_eq!(cold.lesson.title, "Ownership");
    assert_eq!(cold.course.title, "Rust basics");
    assert!(cold.text_html.contains("<h1>"), "markdown was rendered");
}

#[tokio::test]
async fn warm_reads_are_served_from_cache() {
    let store = FakeStore::shared();
    let cache_store = InMemoryCacheStore::shared();
    let service = lesson_service(&store, CacheHandle::new(cache_store));

    let course = store.add_course("Rust basics");
    let lesson = store.add_lesson(course.id, "Ownership", "text");

    let first = service.lesson_content(lesson.id).await.unwrap().unwrap();

    // Mutate the row behind the cache's back; a warm read must not see it.
    store
        .lessons
        .lock()
        .unwrap()
        .get_mut(&lesson.id)
        .unwrap()
        .title = "Renamed directly".to_string();

    let warm = service.lesson_content(lesson.id).await.unwrap().unwrap();
    assert_eq!(warm.lesson.title, first.lesson.title);
}

#[tokio::test]
async fn missing_lessons_resolve_to_none() {
    let store = FakeStore::shared();
    let service = lesson_service(&store, CacheHandle::new(InMemoryCacheStore::shared()));

    let result = service.lesson_content(Uuid::new_v4()).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn corrupt_cache_entries_fall_back_to_the_database() {
    let store = FakeStore::shared();
    let cache_store = InMemoryCacheStore::shared();
    let service = lesson_service(&store, CacheHandle::new(cache_store.clone()));

    let course = store.add_course("Rust basics");
    let lesson = store.add_lesson(course.id, "Ownership", "text");

    cache_store
        .set_with_ttl(
            &keys::lesson_content(lesson.id),
            "{definitely not a bundle",
            Duration::from_secs(300),
        )
        .await
        .unwrap();

    let bundle = service
        .lesson_content(lesson.id)
        .await
        .expect("corruption is absorbed")
        .expect("lesson exists");
    assert_eq!(bundle.lesson.title, "Ownership");
}

#[tokio::test]
async fn unrecognized_completion_flags_are_recomputed() {
    let store = FakeStore::shared();
    let cache_store = InMemoryCacheStore::shared();
    let service = lesson_service(&store, CacheHandle::new(cache_store.clone()));

    let course = store.add_course("Rust basics");
    let lesson = store.add_lesson(course.id, "Ownership", "text");
    let user = Uuid::new_v4();

    cache_store
        .set_with_ttl(
            &keys::completion_flag(user, lesson.id),
            "maybe",
            Duration::from_secs(120),
        )
        .await
        .unwrap();

    assert!(!service.is_completed(lesson.id, user).await.unwrap());
}

// ============================================================================
// Completion mutation
// ============================================================================

#[tokio::test]
async fn completion_is_idempotent() {
    let store = FakeStore::shared();
    let service = lesson_service(&store, CacheHandle::new(InMemoryCacheStore::shared()));

    let course = store.add_course("Rust basics");
    let lesson = store.add_lesson(course.id, "Ownership", "text");
    let user = Uuid::new_v4();

    assert_eq!(
        service.mark_completed(lesson.id, user).await.unwrap(),
        CompletionOutcome::Recorded
    );
    assert_eq!(
        service.mark_completed(lesson.id, user).await.unwrap(),
        CompletionOutcome::AlreadyCompleted
    );
    assert_eq!(
        service.mark_completed(lesson.id, user).await.unwrap(),
        CompletionOutcome::AlreadyCompleted
    );
    assert_eq!(store.completion_count(), 1);
}

#[tokio::test]
async fn completing_an_unknown_lesson_signals_not_found() {
    let store = FakeStore::shared();
    let service = lesson_service(&store, CacheHandle::new(InMemoryCacheStore::shared()));

    let user = Uuid::new_v4();
    assert_eq!(
        service.mark_completed(Uuid::new_v4(), user).await.unwrap(),
        CompletionOutcome::UnknownLesson
    );

    // Prior completions elsewhere change nothing.
    let course = store.add_course("Rust basics");
    let lesson = store.add_lesson(course.id, "Ownership", "text");
    service.mark_completed(lesson.id, user).await.unwrap();
    assert_eq!(
        service.mark_completed(Uuid::new_v4(), user).await.unwrap(),
        CompletionOutcome::UnknownLesson
    );
}

#[tokio::test]
async fn completion_flow_round_trips() {
    let store = FakeStore::shared();
    let service = lesson_service(&store, CacheHandle::new(InMemoryCacheStore::shared()));

    let course = store.add_course("Rust basics");
    let lesson = store.add_lesson(course.id, "Ownership", "text");
    let user = Uuid::new_v4();

    assert!(!service.is_completed(lesson.id, user).await.unwrap());
    assert_eq!(
        service.mark_completed(lesson.id, user).await.unwrap(),
        CompletionOutcome::Recorded
    );
    assert!(service.is_completed(lesson.id, user).await.unwrap());
    assert_eq!(
        service.mark_completed(lesson.id, user).await.unwrap(),
        CompletionOutcome::AlreadyCompleted
    );
}

// ============================================================================
// Cache outage tolerance
// ============================================================================

#[tokio::test]
async fn reads_survive_an_unreachable_cache() {
    let store = FakeStore::shared();
    let service = lesson_service(&store, CacheHandle::new(Arc::new(UnreachableCacheStore)));

    let course = store.add_course("Rust basics");
    let lesson = store.add_lesson(course.id, "Ownership", "# Heading");
    let user = Uuid::new_v4();

    let bundle = service
        .lesson_content(lesson.id)
        .await
        .expect("outage is invisible")
        .expect("lesson exists");
    assert_eq!(bundle.lesson.title, "Ownership");

    assert!(!service.is_completed(lesson.id, user).await.unwrap());
    assert_eq!(
        service.mark_completed(lesson.id, user).await.unwrap(),
        CompletionOutcome::Recorded
    );
    assert!(service.is_completed(lesson.id, user).await.unwrap());
}

// ============================================================================
// Admin invalidation
// ============================================================================

#[tokio::test]
async fn admin_update_makes_the_next_read_current() {
    let store = FakeStore::shared();
    let cache_store = InMemoryCacheStore::shared();
    let cache = CacheHandle::new(cache_store);
    let (_dir, storage) = temp_storage();

    let service = lesson_service(&store, cache.clone());
    let admin = admin_lesson_service(&store, cache, storage);

    let course = store.add_course("Rust basics");
    let lesson = store.add_lesson(course.id, "Ownership", "old text");

    // Warm the cache with the stale row.
    let stale = service.lesson_content(lesson.id).await.unwrap().unwrap();
    assert_eq!(stale.lesson.title, "Ownership");

    admin
        .update_lesson(
            lesson.id,
            "Ownership and borrowing".to_string(),
            Some("new text".to_string()),
            None,
        )
        .await
        .expect("update succeeds")
        .expect("lesson exists");

    let fresh = service.lesson_content(lesson.id).await.unwrap().unwrap();
    assert_eq!(fresh.lesson.title, "Ownership and borrowing");
    assert_eq!(fresh.lesson.text_content, "new text");
}

#[tokio::test]
async fn admin_delete_clears_completion_state_for_every_user() {
    let store = FakeStore::shared();
    let cache_store = InMemoryCacheStore::shared();
    let cache = CacheHandle::new(cache_store.clone());
    let (_dir, storage) = temp_storage();

    let service = lesson_service(&store, cache.clone());
    let admin = admin_lesson_service(&store, cache, storage);

    let course = store.add_course("Rust basics");
    let lesson = store.add_lesson(course.id, "Ownership", "text");
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    service.mark_completed(lesson.id, alice).await.unwrap();
    service.mark_completed(lesson.id, bob).await.unwrap();
    assert!(service.is_completed(lesson.id, alice).await.unwrap());
    assert!(service.is_completed(lesson.id, bob).await.unwrap());

    let course_id = admin
        .delete_lesson(lesson.id)
        .await
        .expect("delete succeeds")
        .expect("lesson existed");
    assert_eq!(course_id, course.id);

    // No completion flag for the lesson survives in the cache.
    assert!(
        cache_store
            .get(&keys::completion_flag(alice, lesson.id))
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        cache_store
            .get(&keys::completion_flag(bob, lesson.id))
            .await
            .unwrap()
            .is_none()
    );

    // A fresh check recomputes from the database, which no longer has rows.
    assert!(!service.is_completed(lesson.id, alice).await.unwrap());
    assert_eq!(store.completion_count(), 0);
}

#[tokio::test]
async fn deleting_a_missing_lesson_signals_not_found() {
    let store = FakeStore::shared();
    let (_dir, storage) = temp_storage();
    let admin = admin_lesson_service(
        &store,
        CacheHandle::new(InMemoryCacheStore::shared()),
        storage,
    );

    let result = admin.delete_lesson(Uuid::new_v4()).await.unwrap();
    assert!(result.is_none());
}
