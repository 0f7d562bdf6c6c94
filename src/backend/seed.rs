//! Fixed seed set loaded into an empty backend-mock database.

pub struct SeedItem {
  pub name: &'static str,
  pub description: &'static str,
  pub price: i64,
  pub category: &'static str,
  pub created_at: &'static str,
  pub updated_at: &'static str,
}

pub struct SeedUser {
  pub email: &'static str,
  pub username: &'static str,
  pub full_name: &'static str,
  pub is_active: bool,
  pub created_at: &'static str,
}

pub const SEED_ITEMS: &[SeedItem] = &[
  SeedItem {
    name: "노트북",
    description: "고성능 노트북",
    price: 1_500_000,
    category: "전자제품",
    created_at: "2024-01-01T00:00:00.000Z",
    updated_at: "2024-01-01T00:00:00.000Z",
  },
  SeedItem {
    name: "마우스",
    description: "무선 마우스",
    price: 30_000,
    category: "전자제품",
    created_at: "2024-01-02T00:00:00.000Z",
    updated_at: "2024-01-02T00:00:00.000Z",
  },
  SeedItem {
    name: "키보드",
    description: "기계식 키보드",
    price: 150_000,
    category: "전자제품",
    created_at: "2024-01-03T00:00:00.000Z",
    updated_at: "2024-01-03T00:00:00.000Z",
  },
];

pub const SEED_USERS: &[SeedUser] = &[
  SeedUser {
    email: "user1@example.com",
    username: "user1",
    full_name: "홍길동",
    is_active: true,
    created_at: "2024-01-01T00:00:00.000Z",
  },
  SeedUser {
    email: "user2@example.com",
    username: "user2",
    full_name: "김철수",
    is_active: true,
    created_at: "2024-01-02T00:00:00.000Z",
  },
];
