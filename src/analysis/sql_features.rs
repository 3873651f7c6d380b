use serde::Serialize;

use super::patterns::PatternSet;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    LeftJoin,
    RightJoin,
    InnerJoin,
    FullOuterJoin,
}

impl JoinType {
    pub const ALL: [JoinType; 4] = [
        Self::LeftJoin,
        Self::RightJoin,
        Self::InnerJoin,
        Self::FullOuterJoin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeftJoin => "left_join",
            Self::RightJoin => "right_join",
            Self::InnerJoin => "inner_join",
            Self::FullOuterJoin => "full_outer_join",
        }
    }
}

type JoinRule = (JoinType, fn(&str) -> bool);

// First match wins. The inner rule also accepts a bare JOIN, so a query mixing
// LEFT JOIN with a plain JOIN is attributed to left_join only, and the full
// outer rule is only reachable if the inner rule is narrowed.
const JOIN_RULES: [JoinRule; 4] = [
    (JoinType::LeftJoin, |sql| {
        sql.contains("LEFT JOIN") || sql.contains("LEFT OUTER JOIN")
    }),
    (JoinType::RightJoin, |sql| {
        sql.contains("RIGHT JOIN") || sql.contains("RIGHT OUTER JOIN")
    }),
    (JoinType::InnerJoin, |sql| {
        sql.contains("INNER JOIN") || sql.contains("JOIN")
    }),
    (JoinType::FullOuterJoin, |sql| {
        sql.contains("FULL JOIN") || sql.contains("FULL OUTER JOIN")
    }),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlFeatures {
    pub join_type: Option<JoinType>,
    pub join_count: usize,
    pub subquery_count: usize,
    pub aggregation: Option<&'static str>,
    pub has_where: bool,
    pub has_group_by: bool,
    pub has_having: bool,
    pub has_order_by: bool,
    pub has_limit: bool,
    pub where_condition_count: usize,
}

impl SqlFeatures {
    pub fn extract(sql: &str, patterns: &PatternSet) -> Self {
        let upper = sql.to_uppercase();

        Self {
            join_type: join_type(&upper),
            join_count: join_count(&upper),
            subquery_count: subquery_count(&upper),
            aggregation: aggregation_function(&upper, patterns),
            has_where: upper.contains("WHERE"),
            has_group_by: upper.contains("GROUP BY"),
            has_having: upper.contains("HAVING"),
            has_order_by: upper.contains("ORDER BY"),
            has_limit: upper.contains("LIMIT"),
            where_condition_count: where_condition_count(sql, patterns),
        }
    }
}

pub fn join_type(sql_upper: &str) -> Option<JoinType> {
    if !sql_upper.contains("JOIN") {
        return None;
    }

    JOIN_RULES
        .iter()
        .find(|(_, rule)| rule(sql_upper))
        .map(|(join_type, _)| *join_type)
}

pub fn join_count(sql_upper: &str) -> usize {
    sql_upper.matches("JOIN").count()
}

pub fn subquery_count(sql_upper: &str) -> usize {
    sql_upper.matches("SELECT").count().saturating_sub(1)
}

pub fn aggregation_function(sql_upper: &str, patterns: &PatternSet) -> Option<&'static str> {
    patterns
        .aggregations
        .iter()
        .find(|(_, regex)| regex.is_match(sql_upper))
        .map(|(function, _)| *function)
}

pub fn where_clause<'a>(sql: &'a str, patterns: &PatternSet) -> Option<&'a str> {
    patterns
        .where_clause
        .captures(sql)
        .and_then(|captures| captures.get(1))
        .map(|clause| clause.as_str())
}

pub fn where_condition_count(sql: &str, patterns: &PatternSet) -> usize {
    let Some(clause) = where_clause(sql, patterns) else {
        return 0;
    };

    let upper = clause.to_uppercase();
    1 + upper.matches(" AND ").count() + upper.matches(" OR ").count()
}

pub fn is_select_star(sql: &str, patterns: &PatternSet) -> bool {
    patterns.select_star.is_match(sql)
}

pub fn select_clause<'a>(sql: &'a str, patterns: &PatternSet) -> Option<&'a str> {
    patterns
        .select_clause
        .captures(sql)
        .and_then(|captures| captures.get(1))
        .map(|clause| clause.as_str())
}

pub fn count_selected_columns(select_clause: &str) -> usize {
    let mut depth = 0_usize;
    let mut columns = 1_usize;

    for character in select_clause.chars() {
        match character {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => columns += 1,
            _ => {}
        }
    }

    columns
}
