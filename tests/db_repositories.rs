//! Postgres repositories against a migrated database.

use sqlx::PgPool;
use yatube::{
    application::{
        pagination::PageWindow,
        repos::{
            CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams,
            CreateUserParams, FollowsRepo, GroupsRepo, ImageChange, PostQueryFilter, PostsRepo,
            PostsWriteRepo, RecordsRepo, RepoError, UpdatePostParams, UsersRepo,
        },
    },
    domain::{
        entities::{GroupRecord, PostRecord, UserRecord},
        relations::Entity,
    },
    infra::db::PostgresRepositories,
};

fn window(number: usize, limit: u32) -> PageWindow {
    PageWindow {
        number,
        offset: (number as u64 - 1) * u64::from(limit),
        limit,
    }
}

async fn user(repos: &PostgresRepositories, username: &str) -> UserRecord {
    repos
        .create_user(CreateUserParams {
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password_hash: "not-a-real-hash".to_string(),
        })
        .await
        .expect("create user")
}

async fn group(repos: &PostgresRepositories, slug: &str) -> GroupRecord {
    repos
        .create_group(CreateGroupParams {
            title: format!("Группа {slug}"),
            slug: slug.to_string(),
            description: "Описание".to_string(),
        })
        .await
        .expect("create group")
}

async fn post(
    repos: &PostgresRepositories,
    author: &UserRecord,
    text: &str,
    group_id: Option<i64>,
) -> PostRecord {
    repos
        .create_post(CreatePostParams {
            author_id: author.id,
            text: text.to_string(),
            group_id,
            image: None,
        })
        .await
        .expect("create post")
}

/// Pin `created_at` so ordering does not depend on insertion order.
async fn backdate(pool: &PgPool, post_id: i64, minutes_ago: i32) {
    sqlx::query(
        "UPDATE posts SET created_at = now() - make_interval(mins => $2) WHERE id = $1",
    )
    .bind(post_id)
    .bind(minutes_ago)
    .execute(pool)
    .await
    .expect("backdate post");
}

#[sqlx::test(migrations = "./migrations")]
async fn feed_pages_are_newest_first_by_timestamp(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let author = user(&repos, "auth").await;

    // Later inserts get older timestamps, so ids and times disagree.
    let mut inserted = Vec::new();
    for index in 0..14 {
        let created = post(&repos, &author, &format!("пост {index}"), None).await;
        backdate(&pool, created.id, index).await;
        inserted.push(created.id);
    }

    let filter = PostQueryFilter::default();
    assert_eq!(repos.count_posts(&filter).await.expect("count"), 14);

    let first = repos.list_posts(&filter, window(1, 10)).await.expect("page 1");
    let second = repos.list_posts(&filter, window(2, 10)).await.expect("page 2");
    assert_eq!(first.len(), 10);
    assert_eq!(second.len(), 4);

    let listed: Vec<i64> = first
        .iter()
        .chain(second.iter())
        .map(|entry| entry.post.id)
        .collect();
    assert_eq!(listed, inserted);

    let stamps: Vec<_> = first
        .iter()
        .chain(second.iter())
        .map(|entry| entry.post.created_at)
        .collect();
    assert!(stamps.windows(2).all(|pair| pair[0] > pair[1]));
}

#[sqlx::test(migrations = "./migrations")]
async fn group_and_search_filters_narrow_the_listing(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = user(&repos, "auth").await;
    let cats = group(&repos, "cats").await;
    let dogs = group(&repos, "dogs").await;

    let in_cats = post(&repos, &author, "p0 50%_off", Some(cats.id)).await;
    post(&repos, &author, "p1 500 off", Some(dogs.id)).await;
    post(&repos, &author, "p2 без группы", None).await;

    let by_group = repos
        .list_posts(&PostQueryFilter::group(cats.id), window(1, 10))
        .await
        .expect("group listing");
    let ids: Vec<i64> = by_group.iter().map(|entry| entry.post.id).collect();
    assert_eq!(ids, vec![in_cats.id]);
    assert_eq!(
        by_group[0].group.as_ref().map(|group| group.slug.as_str()),
        Some("cats")
    );

    let searched = repos
        .list_posts(&PostQueryFilter::search("50%_"), window(1, 10))
        .await
        .expect("search listing");
    let ids: Vec<i64> = searched.iter().map(|entry| entry.post.id).collect();
    assert_eq!(ids, vec![in_cats.id]);

    assert_eq!(
        repos
            .count_posts(&PostQueryFilter::author(author.id))
            .await
            .expect("author count"),
        3
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn follow_feed_follows_pairs_and_follow_is_idempotent(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let reader = user(&repos, "reader").await;
    let followed = user(&repos, "followed").await;
    let other = user(&repos, "other").await;
    let wanted = post(&repos, &followed, "от любимого автора", None).await;
    post(&repos, &other, "от чужого автора", None).await;

    assert!(repos.follow(reader.id, followed.id).await.expect("first follow"));
    assert!(!repos.follow(reader.id, followed.id).await.expect("second follow"));
    assert!(repos.is_following(reader.id, followed.id).await.expect("is following"));

    let filter = PostQueryFilter::followed_by(reader.id);
    let feed = repos.list_posts(&filter, window(1, 10)).await.expect("follow feed");
    let ids: Vec<i64> = feed.iter().map(|entry| entry.post.id).collect();
    assert_eq!(ids, vec![wanted.id]);
    assert_eq!(repos.count_posts(&filter).await.expect("count"), 1);

    let outsider = PostQueryFilter::followed_by(other.id);
    assert_eq!(repos.count_posts(&outsider).await.expect("count"), 0);

    assert_eq!(repos.unfollow(reader.id, followed.id).await.expect("unfollow"), 1);
    assert_eq!(repos.unfollow(reader.id, followed.id).await.expect("unfollow again"), 0);
    assert_eq!(repos.count_posts(&filter).await.expect("count"), 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn self_follow_is_refused_by_storage(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let lonely = user(&repos, "lonely").await;

    match repos.follow(lonely.id, lonely.id).await {
        Err(RepoError::Integrity { message }) => {
            assert!(message.contains("follows_no_self_follow"), "{message}");
        }
        other => panic!("expected integrity error, got {other:?}"),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_group_keeps_its_posts(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = user(&repos, "auth").await;
    let cats = group(&repos, "cats").await;
    let grouped = post(&repos, &author, "в группе", Some(cats.id)).await;

    repos
        .delete_record(Entity::Group, cats.id)
        .await
        .expect("delete group");

    let kept = PostsRepo::find_by_id(&repos, grouped.id)
        .await
        .expect("find post")
        .expect("post survives");
    assert_eq!(kept.group_id, None);
    assert!(repos.find_by_slug("cats").await.expect("find group").is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_user_removes_everything_they_own(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = user(&repos, "author").await;
    let reader = user(&repos, "reader").await;
    let authored = post(&repos, &author, "пост автора", None).await;
    let readers_post = post(&repos, &reader, "пост читателя", None).await;

    for (post_id, author_id) in [(authored.id, reader.id), (readers_post.id, author.id)] {
        repos
            .create_comment(CreateCommentParams {
                post_id,
                author_id,
                text: "комментарий".to_string(),
            })
            .await
            .expect("comment");
    }
    repos.follow(reader.id, author.id).await.expect("follow");
    repos.follow(author.id, reader.id).await.expect("follow back");

    repos
        .delete_record(Entity::User, author.id)
        .await
        .expect("delete user");

    assert!(repos.find_by_username("author").await.expect("find").is_none());
    assert_eq!(
        repos
            .count_posts(&PostQueryFilter::default())
            .await
            .expect("count"),
        1
    );
    assert!(repos.list_for_post(authored.id).await.expect("comments").is_empty());
    assert!(
        repos
            .list_for_post(readers_post.id)
            .await
            .expect("comments")
            .is_empty()
    );
    assert!(!repos.is_following(reader.id, author.id).await.expect("pair"));
    assert!(!repos.is_following(author.id, reader.id).await.expect("pair"));
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_post_removes_its_comments(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = user(&repos, "auth").await;
    let target = post(&repos, &author, "удаляемый", None).await;
    let other = post(&repos, &author, "остаётся", None).await;
    for post_id in [target.id, other.id] {
        repos
            .create_comment(CreateCommentParams {
                post_id,
                author_id: author.id,
                text: "комментарий".to_string(),
            })
            .await
            .expect("comment");
    }

    repos
        .delete_record(Entity::Post, target.id)
        .await
        .expect("delete post");

    assert!(
        PostsRepo::find_by_id(&repos, target.id)
            .await
            .expect("find")
            .is_none()
    );
    assert!(repos.list_for_post(target.id).await.expect("comments").is_empty());
    assert_eq!(repos.list_for_post(other.id).await.expect("comments").len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_missing_record_is_not_found(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    assert!(matches!(
        repos.delete_record(Entity::Post, 404).await,
        Err(RepoError::NotFound)
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn post_edit_keeps_replaces_or_clears_the_image(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = user(&repos, "auth").await;
    let created = repos
        .create_post(CreatePostParams {
            author_id: author.id,
            text: "с картинкой".to_string(),
            group_id: None,
            image: Some("posts/first.gif".to_string()),
        })
        .await
        .expect("create post");

    let edit = |text: &str, image: ImageChange| UpdatePostParams {
        id: created.id,
        text: text.to_string(),
        group_id: None,
        image,
    };

    let kept = repos
        .update_post(edit("без изменений", ImageChange::Keep))
        .await
        .expect("keep");
    assert_eq!(kept.image.as_deref(), Some("posts/first.gif"));
    assert_eq!(kept.text, "без изменений");

    let replaced = repos
        .update_post(edit(
            "новая картинка",
            ImageChange::Replace("posts/second.gif".to_string()),
        ))
        .await
        .expect("replace");
    assert_eq!(replaced.image.as_deref(), Some("posts/second.gif"));

    let cleared = repos
        .update_post(edit("без картинки", ImageChange::Clear))
        .await
        .expect("clear");
    assert_eq!(cleared.image, None);

    assert!(matches!(
        repos
            .update_post(UpdatePostParams {
                id: created.id + 1000,
                ..edit("нет такого", ImageChange::Keep)
            })
            .await,
        Err(RepoError::NotFound)
    ));
}
